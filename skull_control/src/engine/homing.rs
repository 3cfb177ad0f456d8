//! Homing supervision: travel range discovery between two limit switches.
//!
//! The supervisor does not generate trajectories. Each tick it looks at the
//! confirmed switch edges and the axis position, decides when a phase is
//! done, and exposes the setpoint the engine should feed to its planner.
//!
//! ## Phases
//!
//! | Phase      | Setpoint                  | Done when                        |
//! |------------|---------------------------|----------------------------------|
//! | SeekMin    | jog −speed                | min edge (or min already pressed)|
//! | BackoffMin | edge + backoff            | settled there → zero reference   |
//! | SeekMax    | jog +speed                | max edge                         |
//! | BackoffMax | edge − backoff            | settled → limits computed        |
//! | MoveToHome | zero + min + range·pct    | settled → success                |
//!
//! Limits are `[margin, max_edge − margin]` relative to the zero reference.
//! Any unexpected edge, a drive alarm or a phase timeout fails the run; the
//! engine keeps its previous frame and limits, so partial data is discarded.

use skull_common::control::config::HomingConfig;
use skull_common::control::error::FaultFlags;
use skull_common::control::motion::PositionLimits;

use super::limits::{ConfirmedEdges, LimitLevels, LimitSide};

// ─── Homing Phases ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingPhase {
    Idle,
    SeekMin,
    BackoffMin,
    SeekMax,
    BackoffMax,
    MoveToHome,
    Complete,
    Failed,
}

impl HomingPhase {
    /// Coarse progress for status display, 0..=100.
    pub const fn progress(self) -> u8 {
        match self {
            Self::Idle | Self::Failed => 0,
            Self::SeekMin => 10,
            Self::BackoffMin => 25,
            Self::SeekMax => 50,
            Self::BackoffMax => 75,
            Self::MoveToHome => 90,
            Self::Complete => 100,
        }
    }
}

// ─── Tick I/O ───────────────────────────────────────────────────────

/// What the supervisor sees each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HomingInput {
    /// Axis position [steps] in the engine's current frame.
    pub position: i32,
    /// Planner at rest on its target.
    pub settled: bool,
    pub edges: ConfirmedEdges,
    pub levels: LimitLevels,
    pub alarm: bool,
}

/// Setpoint for the planner while homing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HomingSetpoint {
    Hold,
    /// Constant velocity [steps/s], signed.
    Jog(f64),
    /// Absolute position in the engine's current frame.
    Target(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingFailReason {
    Timeout(HomingPhase),
    UnexpectedLimit(LimitSide),
    DriveAlarm,
    FollowingError,
    RangeTooSmall { range: i64 },
}

impl HomingFailReason {
    /// Fault flags latched for this failure.
    pub fn flags(self) -> FaultFlags {
        let detail = match self {
            Self::Timeout(_) => FaultFlags::HOMING_TIMEOUT,
            Self::UnexpectedLimit(LimitSide::Min) => FaultFlags::LIMIT_MIN,
            Self::UnexpectedLimit(LimitSide::Max) => FaultFlags::LIMIT_MAX,
            Self::DriveAlarm => FaultFlags::DRIVE_ALARM,
            Self::FollowingError => FaultFlags::FOLLOWING_ERROR,
            Self::RangeTooSmall { .. } => FaultFlags::RANGE_TOO_SMALL,
        };
        FaultFlags::HOMING_FAILED | detail
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HomingTickResult {
    InProgress,
    /// A switch edge ended a seek phase; the engine must halt immediately.
    EdgeFound(LimitSide),
    /// Shift the frame by `zero_offset` and adopt `limits`.
    Success {
        zero_offset: i32,
        limits: PositionLimits,
    },
    Failed { reason: HomingFailReason },
}

// ─── Homing Supervisor ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HomingSupervisor {
    phase: HomingPhase,
    speed: f64,
    backoff: i32,
    margin: i32,
    home_percent: u8,
    min_range: i32,
    timeout_cycles: u64,
    phase_cycles: u64,
    /// Zero reference in the engine frame.
    zero: i32,
    /// Max edge relative to `zero`.
    max_edge: i32,
    target: i32,
    limits: PositionLimits,
}

impl HomingSupervisor {
    /// `cycle_time_us`: engine period in microseconds.
    pub fn new(config: &HomingConfig, cycle_time_us: u32) -> Self {
        let mut sup = Self {
            phase: HomingPhase::Idle,
            speed: 0.0,
            backoff: 0,
            margin: 0,
            home_percent: 0,
            min_range: 0,
            timeout_cycles: u64::MAX,
            phase_cycles: 0,
            zero: 0,
            max_edge: 0,
            target: 0,
            limits: PositionLimits::new(0, 0),
        };
        sup.configure(config, cycle_time_us);
        sup
    }

    /// Adopt new parameters. Only call while idle.
    pub fn configure(&mut self, config: &HomingConfig, cycle_time_us: u32) {
        self.speed = config.speed;
        self.backoff = config.backoff_steps;
        self.margin = config.limit_margin;
        self.home_percent = config.home_position_percent;
        self.min_range = config.min_usable_range;
        self.timeout_cycles = if cycle_time_us > 0 {
            (u64::from(config.timeout_ms) * 1000).div_ceil(u64::from(cycle_time_us))
        } else {
            u64::MAX
        };
    }

    #[inline]
    pub fn phase(&self) -> HomingPhase {
        self.phase
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(
            self.phase,
            HomingPhase::SeekMin
                | HomingPhase::BackoffMin
                | HomingPhase::SeekMax
                | HomingPhase::BackoffMax
                | HomingPhase::MoveToHome
        )
    }

    #[inline]
    pub fn progress(&self) -> u8 {
        self.phase.progress()
    }

    /// Search speed [steps/s].
    #[inline]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn start(&mut self) {
        self.zero = 0;
        self.max_edge = 0;
        self.enter(HomingPhase::SeekMin);
    }

    /// Abandon the run. Discovered data is dropped.
    pub fn abort(&mut self) {
        self.phase = HomingPhase::Idle;
    }

    pub fn setpoint(&self) -> HomingSetpoint {
        match self.phase {
            HomingPhase::SeekMin => HomingSetpoint::Jog(-self.speed),
            HomingPhase::SeekMax => HomingSetpoint::Jog(self.speed),
            HomingPhase::BackoffMin | HomingPhase::BackoffMax | HomingPhase::MoveToHome => {
                HomingSetpoint::Target(self.target)
            }
            _ => HomingSetpoint::Hold,
        }
    }

    /// Fail the run from outside (e.g. following error).
    pub fn fail(&mut self, reason: HomingFailReason) -> HomingTickResult {
        self.phase = HomingPhase::Failed;
        HomingTickResult::Failed { reason }
    }

    /// Tick the supervisor once per engine cycle.
    pub fn tick(&mut self, input: &HomingInput) -> HomingTickResult {
        if !self.is_active() {
            return HomingTickResult::InProgress;
        }

        self.phase_cycles += 1;
        if input.alarm {
            return self.fail(HomingFailReason::DriveAlarm);
        }
        if self.phase_cycles > self.timeout_cycles {
            return self.fail(HomingFailReason::Timeout(self.phase));
        }

        let at_target = input.settled && input.position == self.target;

        match self.phase {
            HomingPhase::SeekMin => {
                if input.edges.max {
                    return self.fail(HomingFailReason::UnexpectedLimit(LimitSide::Max));
                }
                if input.edges.min || input.levels.min {
                    self.target = input.position.saturating_add(self.backoff);
                    self.enter(HomingPhase::BackoffMin);
                    return HomingTickResult::EdgeFound(LimitSide::Min);
                }
            }
            HomingPhase::BackoffMin => {
                if let Some(side) = input.edges.first() {
                    return self.fail(HomingFailReason::UnexpectedLimit(side));
                }
                if at_target {
                    self.zero = self.target;
                    self.enter(HomingPhase::SeekMax);
                }
            }
            HomingPhase::SeekMax => {
                if input.edges.min {
                    return self.fail(HomingFailReason::UnexpectedLimit(LimitSide::Min));
                }
                if input.edges.max || input.levels.max {
                    self.max_edge = input.position.saturating_sub(self.zero);
                    self.target = input.position.saturating_sub(self.backoff);
                    self.enter(HomingPhase::BackoffMax);
                    return HomingTickResult::EdgeFound(LimitSide::Max);
                }
            }
            HomingPhase::BackoffMax => {
                if let Some(side) = input.edges.first() {
                    return self.fail(HomingFailReason::UnexpectedLimit(side));
                }
                if at_target {
                    let min = self.margin;
                    let max = self.max_edge.saturating_sub(self.margin);
                    let range = i64::from(max) - i64::from(min);
                    if range < i64::from(self.min_range) {
                        return self.fail(HomingFailReason::RangeTooSmall { range });
                    }
                    self.limits = PositionLimits::new(min, max);
                    self.target = self.zero + self.limits.at_percent(self.home_percent);
                    self.enter(HomingPhase::MoveToHome);
                }
            }
            HomingPhase::MoveToHome => {
                if let Some(side) = input.edges.first() {
                    return self.fail(HomingFailReason::UnexpectedLimit(side));
                }
                if at_target {
                    self.phase = HomingPhase::Complete;
                    return HomingTickResult::Success {
                        zero_offset: self.zero,
                        limits: self.limits,
                    };
                }
            }
            _ => {}
        }
        HomingTickResult::InProgress
    }

    fn enter(&mut self, phase: HomingPhase) {
        self.phase = phase;
        self.phase_cycles = 0;
    }
}
