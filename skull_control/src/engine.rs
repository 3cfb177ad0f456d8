//! Motion engine: owns the axis, runs homing and motion, publishes status.
//!
//! ## Tick order
//! 1. Sample drive inputs and confirm latched limit edges. Limit, alarm and
//!    following-error faults are handled here, before any command.
//! 2. Dequeue and apply at most one command (FIFO).
//! 3. Step the S-curve planner.
//! 4. Send the new setpoint to the drive.
//! 5. Copy status out (bounded wait; skipped if the lock is busy). The
//!    published position is the one the drive reported, not the setpoint.
//!
//! Timers (limit debounce) read the monotonic clock handed to
//! [`MotionEngine::tick_at`], so an overrun does not stretch them.
//!
//! Nothing in a tick blocks, allocates or returns an error. Faults become
//! [`FaultFlags`] plus the `Error` state, and `Home` is always accepted as
//! the way out.

pub mod homing;
pub mod limits;
pub mod profile;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use skull_common::control::command::{CommandKind, MotionCommand};
use skull_common::control::config::{CoreConfig, LimitAction};
use skull_common::control::error::FaultFlags;
use skull_common::control::motion::{MotionProfile, PositionLimits, ProfileOverride};
use skull_common::control::status::{SystemState, SystemStatus};

use crate::bus::{CommandBus, StatusBoard};
use crate::config::ConfigHandle;
use crate::cycle::PeriodicTask;
use crate::drive::{AxisDriver, DriveCommand, DriveInputs};

use homing::{HomingFailReason, HomingInput, HomingSetpoint, HomingSupervisor, HomingTickResult};
use limits::{ConfirmedEdges, LimitCapture, LimitDebouncer, LimitLevels};
use profile::SCurvePlanner;
use state::{EngineEvent, EngineStateMachine, EngineTransition};

/// Why a command was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    DriveDisabled,
    State(&'static str),
}

// ─── Motion Engine ──────────────────────────────────────────────────

pub struct MotionEngine {
    config: ConfigHandle,
    bus: Arc<CommandBus>,
    status: Arc<StatusBoard>,
    capture: Arc<LimitCapture>,
    drive: Box<dyn AxisDriver>,

    machine: EngineStateMachine,
    planner: SCurvePlanner,
    homing: HomingSupervisor,
    debouncer: LimitDebouncer,

    limits: PositionLimits,
    /// Raw drive position of the engine's zero.
    origin: i32,
    enabled: bool,
    faults: FaultFlags,
    inputs: DriveInputs,
    alarm_seen: bool,
    following_tripped: bool,
    last_sent_raw: i32,
    last_command_id: u32,

    config_generation: u64,
    cycle_us: u32,
}

impl MotionEngine {
    pub fn new(
        config: ConfigHandle,
        bus: Arc<CommandBus>,
        status: Arc<StatusBoard>,
        capture: Arc<LimitCapture>,
        drive: Box<dyn AxisDriver>,
    ) -> Self {
        let cfg = config.snapshot();
        let cycle_us = cfg.engine.cycle_time_us;
        let config_generation = config.generation();
        Self {
            planner: SCurvePlanner::new(0, cfg.profile()),
            homing: HomingSupervisor::new(&cfg.homing, cycle_us),
            limits: cfg.position_limits(),
            config,
            bus,
            status,
            capture,
            drive,
            machine: EngineStateMachine::new(),
            debouncer: LimitDebouncer::new(),
            origin: 0,
            enabled: false,
            faults: FaultFlags::empty(),
            inputs: DriveInputs::default(),
            alarm_seen: false,
            following_tripped: false,
            last_sent_raw: 0,
            last_command_id: 0,
            config_generation,
            cycle_us,
        }
    }

    /// Handle for producers and status readers.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            bus: Arc::clone(&self.bus),
            status: Arc::clone(&self.status),
        }
    }

    /// Non-blocking enqueue onto the engine's command bus.
    #[inline]
    pub fn submit(&self, cmd: MotionCommand) -> bool {
        self.bus.submit(cmd)
    }

    /// Last published status.
    pub fn status(&self) -> SystemStatus {
        self.status.snapshot()
    }

    #[inline]
    pub fn is_homed(&self) -> bool {
        self.machine.is_homed()
    }

    #[inline]
    pub fn is_moving(&self) -> bool {
        self.machine.is_moving()
    }

    #[inline]
    pub fn position_limits(&self) -> PositionLimits {
        self.limits
    }

    #[inline]
    pub fn is_limit_fault_active(&self) -> bool {
        self.faults.has_limit_fault()
    }

    #[inline]
    pub fn state(&self) -> SystemState {
        self.machine.state()
    }

    #[inline]
    pub fn faults(&self) -> FaultFlags {
        self.faults
    }

    /// Commanded position [steps] in the homed frame.
    #[inline]
    pub fn position(&self) -> i32 {
        self.planner.position()
    }

    /// Position the drive last reported [steps] in the homed frame.
    #[inline]
    pub fn actual_position(&self) -> i32 {
        self.inputs.position - self.origin
    }

    /// Run one engine cycle at `now_ms` on the monotonic clock.
    ///
    /// The worker passes [`CommandBus::now_ms`]; tests pass simulated time.
    pub fn tick_at(&mut self, now_ms: u64) {
        let cfg = self.config.snapshot();
        let dt = f64::from(self.cycle_us) / 1_000_000.0;

        if self.machine.state() == SystemState::Init {
            self.boot(&cfg);
        }
        self.follow_config(&cfg);
        let inputs = self.drive.sample();
        self.inputs = inputs;
        let actual = inputs.position - self.origin;
        let levels = LimitLevels {
            min: inputs.limit_min,
            max: inputs.limit_max,
        };
        let edges =
            self.debouncer
                .poll(&self.capture, levels, now_ms, cfg.engine.limit_debounce_ms);

        // 1. Latched inputs, independent of queued commands.
        if self.homing.is_active() {
            let input = HomingInput {
                position: actual,
                settled: self.planner.is_settled(),
                edges,
                levels,
                alarm: inputs.alarm,
            };
            self.supervise_homing(&cfg, &input);
        } else {
            self.check_limits(&cfg, edges);
            self.check_alarm(inputs.alarm);
        }
        self.check_following_error(&cfg, inputs.position);
        self.alarm_seen = inputs.alarm;

        // 2. At most one command per tick.
        if let Some(cmd) = self.bus.pop() {
            self.apply_command(&cfg, cmd);
        }

        // 3. Profile.
        if self.enabled {
            self.planner.step(dt);
        }
        if self.machine.state() == SystemState::Moving && self.planner.is_settled() {
            self.transition(EngineEvent::MotionSettled);
        }

        // 4. Drive.
        let command = DriveCommand {
            position: self.planner.position() + self.origin,
            velocity: self.planner.velocity(),
            enabled: self.enabled,
        };
        self.drive
            .apply(&command, Duration::from_micros(u64::from(self.cycle_us)));
        self.last_sent_raw = command.position;

        // 5. Status.
        self.publish();
    }

    fn boot(&mut self, cfg: &CoreConfig) {
        let init = self.drive.init();
        let position = self.drive.sample().position;
        self.planner = SCurvePlanner::new(position - self.origin, cfg.profile());
        self.last_sent_raw = position;
        self.enabled = cfg.engine.enable_on_start;
        self.transition(EngineEvent::Boot);
        info!(
            driver = self.drive.name(),
            position = self.planner.position(),
            min = self.limits.min,
            max = self.limits.max,
            enabled = self.enabled,
            "motion engine started"
        );
        if let Err(e) = init {
            error!("drive init failed: {e}");
            self.raise_fault(FaultFlags::DRIVE_ALARM, LimitAction::Halt);
            return;
        }
        if cfg.engine.auto_home_on_boot {
            info!("auto-home on boot");
            self.start_homing(cfg);
        }
    }

    /// Until homing has discovered the real range, the configured limits
    /// apply and follow reloads.
    fn follow_config(&mut self, cfg: &CoreConfig) {
        let generation = self.config.generation();
        if generation == self.config_generation {
            return;
        }
        self.config_generation = generation;
        if !self.machine.is_homed() && !self.homing.is_active() {
            self.limits = cfg.position_limits();
        }
        info!(
            generation,
            max_speed = cfg.motion.max_speed,
            min = self.limits.min,
            max = self.limits.max,
            "engine settings reloaded"
        );
    }

    // ─── Faults ─────────────────────────────────────────────────────

    fn check_limits(&mut self, cfg: &CoreConfig, edges: ConfirmedEdges) {
        if !edges.any() {
            return;
        }
        let mut flags = FaultFlags::empty();
        if edges.min {
            flags |= FaultFlags::LIMIT_MIN;
        }
        if edges.max {
            flags |= FaultFlags::LIMIT_MAX;
        }
        self.raise_fault(flags, cfg.engine.limit_action);
    }

    fn check_alarm(&mut self, alarm: bool) {
        if alarm && !self.alarm_seen {
            self.raise_fault(FaultFlags::DRIVE_ALARM, LimitAction::Halt);
        }
    }

    fn check_following_error(&mut self, cfg: &CoreConfig, actual_raw: i32) {
        let limit = cfg.engine.following_error_limit;
        if limit == 0 || !self.enabled || self.following_tripped {
            return;
        }
        let deviation = actual_raw.abs_diff(self.last_sent_raw);
        if deviation <= limit {
            return;
        }
        self.following_tripped = true;
        warn!(deviation, limit, "following error");
        self.planner.halt_at(actual_raw - self.origin);
        if self.homing.is_active() {
            let result = self.homing.fail(HomingFailReason::FollowingError);
            if let HomingTickResult::Failed { reason } = result {
                self.fail_homing(reason);
            }
        } else {
            self.raise_fault(FaultFlags::FOLLOWING_ERROR, LimitAction::Halt);
        }
    }

    fn raise_fault(&mut self, flags: FaultFlags, action: LimitAction) {
        self.faults |= flags;
        match action {
            LimitAction::Halt => self.planner.halt(),
            LimitAction::Decelerate => self.planner.stop(),
        }
        self.transition(EngineEvent::Fault);
        error!(
            faults = ?flags,
            position = self.planner.position(),
            state = ?self.machine.state(),
            "fault raised"
        );
    }

    // ─── Homing ─────────────────────────────────────────────────────

    fn start_homing(&mut self, cfg: &CoreConfig) {
        if self.homing.is_active() {
            debug!("home ignored: homing already active");
            return;
        }
        if !self.transition(EngineEvent::StartHoming) {
            return;
        }
        self.enabled = true;
        self.following_tripped = false;
        self.homing.configure(&cfg.homing, self.cycle_us);
        self.homing.start();
        info!(
            speed = cfg.homing.speed,
            backoff = cfg.homing.backoff_steps,
            margin = cfg.homing.limit_margin,
            "homing started"
        );
        self.follow_homing_setpoint(cfg);
    }

    fn supervise_homing(&mut self, cfg: &CoreConfig, input: &HomingInput) {
        match self.homing.tick(input) {
            HomingTickResult::InProgress => {}
            HomingTickResult::EdgeFound(side) => {
                self.planner.halt_at(input.position);
                debug!(?side, position = input.position, "homing edge");
            }
            HomingTickResult::Success {
                zero_offset,
                limits,
            } => self.finish_homing(cfg, zero_offset, limits),
            HomingTickResult::Failed { reason } => self.fail_homing(reason),
        }
        if self.homing.is_active() {
            self.follow_homing_setpoint(cfg);
        }
    }

    fn follow_homing_setpoint(&mut self, cfg: &CoreConfig) {
        let profile = MotionProfile::new(
            self.homing.speed(),
            cfg.motion.acceleration,
            cfg.motion.deceleration,
        );
        match self.homing.setpoint() {
            HomingSetpoint::Hold => {}
            HomingSetpoint::Jog(velocity) => self.planner.jog(velocity, profile),
            HomingSetpoint::Target(target) => self.planner.move_to(target, profile),
        }
    }

    fn finish_homing(&mut self, cfg: &CoreConfig, zero_offset: i32, limits: PositionLimits) {
        self.planner.rebase(zero_offset);
        self.origin += zero_offset;
        self.limits = limits;
        self.faults = FaultFlags::empty();
        self.following_tripped = false;
        let here = self.planner.target();
        self.planner.move_to(here, cfg.profile());
        self.transition(EngineEvent::HomingComplete);
        info!(
            min = limits.min,
            max = limits.max,
            home = here,
            "homing complete"
        );
    }

    fn fail_homing(&mut self, reason: HomingFailReason) {
        self.planner.halt();
        self.faults |= reason.flags();
        self.transition(EngineEvent::HomingFailed);
        error!(?reason, "homing failed");
    }

    // ─── Commands ───────────────────────────────────────────────────

    fn apply_command(&mut self, cfg: &CoreConfig, cmd: MotionCommand) {
        self.last_command_id = cmd.id();
        debug!(id = cmd.id(), kind = cmd.kind().label(), "command");
        let result = match cmd.kind() {
            CommandKind::Home => {
                self.start_homing(cfg);
                Ok(())
            }
            CommandKind::EmergencyStop => {
                self.emergency_stop();
                Ok(())
            }
            CommandKind::Stop => {
                self.stop();
                Ok(())
            }
            CommandKind::Enable => {
                self.enabled = true;
                info!("drive enabled");
                Ok(())
            }
            CommandKind::Disable => {
                self.disable();
                Ok(())
            }
            CommandKind::MoveAbsolute { target } => {
                self.start_move(cfg, i64::from(target), cmd.profile())
            }
            CommandKind::MoveRelative { delta } => {
                let base = i64::from(self.planner.target());
                self.start_move(cfg, base + i64::from(delta), cmd.profile())
            }
        };
        if let Err(reason) = result {
            warn!(id = cmd.id(), kind = cmd.kind().label(), ?reason, "command rejected");
        }
    }

    fn start_move(
        &mut self,
        cfg: &CoreConfig,
        requested: i64,
        profile: ProfileOverride,
    ) -> Result<(), RejectReason> {
        if !self.enabled {
            return Err(RejectReason::DriveDisabled);
        }
        if let EngineTransition::Rejected(reason) =
            self.machine.handle_event(EngineEvent::StartMotion)
        {
            return Err(RejectReason::State(reason));
        }
        let requested = requested.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
        let target = self.limits.clamp(requested);
        if target != requested {
            debug!(requested, target, "target clamped to limits");
        }
        self.planner
            .move_to(target, cfg.profile().with_override(&profile));
        Ok(())
    }

    fn emergency_stop(&mut self) {
        if self.homing.is_active() {
            self.homing.abort();
        }
        self.planner.halt();
        self.faults |= FaultFlags::EMERGENCY_STOP;
        self.transition(EngineEvent::EmergencyStop);
        warn!(position = self.planner.position(), "emergency stop");
    }

    fn stop(&mut self) {
        if self.homing.is_active() {
            self.homing.abort();
            self.planner.stop();
            self.transition(EngineEvent::HomingCancelled);
            info!("homing cancelled by stop");
        } else if self.machine.state() == SystemState::Moving {
            self.planner.stop();
            debug!(target = self.planner.target(), "controlled stop");
        }
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.planner.halt();
        if self.homing.is_active() {
            self.homing.abort();
            self.transition(EngineEvent::HomingCancelled);
        }
        if self.machine.state() == SystemState::Moving {
            self.transition(EngineEvent::MotionSettled);
        }
        info!("drive disabled");
    }

    // ─── Status ─────────────────────────────────────────────────────

    fn transition(&mut self, event: EngineEvent) -> bool {
        let from = self.machine.state();
        match self.machine.handle_event(event) {
            EngineTransition::Ok(to) => {
                if to != from {
                    debug!(?from, ?to, ?event, "engine state");
                }
                true
            }
            EngineTransition::Rejected(reason) => {
                debug!(?from, ?event, reason, "transition rejected");
                false
            }
        }
    }

    fn publish(&self) {
        let progress = if self.machine.is_homed() {
            100
        } else if self.homing.is_active() {
            self.homing.progress()
        } else {
            0
        };
        let published = self.status.publish(|s| {
            s.current_position = self.actual_position();
            s.target_position = self.planner.target();
            s.current_speed = self.planner.velocity();
            s.enabled = self.enabled;
            s.limit_min_active = self.inputs.limit_min;
            s.limit_max_active = self.inputs.limit_max;
            s.state = self.machine.state();
            s.homed = self.machine.is_homed();
            s.faults = self.faults;
            s.homing_progress = progress;
            s.position_limits = self.limits;
            s.last_command_id = self.last_command_id;
        });
        if !published {
            debug!("status lock busy, update skipped");
        }
    }
}

impl PeriodicTask for MotionEngine {
    fn name(&self) -> &'static str {
        "engine"
    }

    fn tick(&mut self) {
        let now_ms = self.bus.now_ms();
        self.tick_at(now_ms);
    }

    fn shutdown(&mut self) {
        if let Err(e) = self.drive.shutdown() {
            error!("drive shutdown failed: {e}");
        }
    }
}

// ─── Engine Handle ──────────────────────────────────────────────────

/// Cloneable access for front-ends and the decoder.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    bus: Arc<CommandBus>,
    status: Arc<StatusBoard>,
}

impl EngineHandle {
    pub fn new(bus: Arc<CommandBus>, status: Arc<StatusBoard>) -> Self {
        Self { bus, status }
    }

    /// Non-blocking enqueue. `false` means the queue was full.
    #[inline]
    pub fn submit(&self, cmd: MotionCommand) -> bool {
        self.bus.submit(cmd)
    }

    /// Stamp and submit a command of `kind`.
    pub fn send(&self, kind: CommandKind) -> bool {
        self.bus.send(kind)
    }

    /// Stamp and submit with a speed/acceleration override.
    pub fn send_with(&self, kind: CommandKind, profile: ProfileOverride) -> bool {
        self.bus.submit(self.bus.command_with(kind, profile))
    }

    pub fn status(&self) -> SystemStatus {
        self.status.snapshot()
    }

    pub fn is_homed(&self) -> bool {
        self.status().homed
    }

    pub fn is_moving(&self) -> bool {
        self.status().is_moving()
    }

    pub fn position_limits(&self) -> PositionLimits {
        self.status().position_limits
    }

    pub fn is_limit_fault_active(&self) -> bool {
        self.status().is_limit_fault_active()
    }

    pub fn bus(&self) -> &Arc<CommandBus> {
        &self.bus
    }
}
