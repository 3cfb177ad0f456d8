//! In-process stepper drive for bench runs and tests.
//!
//! Tracks the commanded step position exactly unless stalled. Two limit
//! switches sit at fixed raw positions; when the axis reaches one, the
//! switch level goes active and a rising edge is reported to the shared
//! [`LimitCapture`], the same way the edge interrupt does on hardware.
//!
//! [`SimHandle`] gives tests a side door into the model: alarm and stall
//! injection, spurious edges, and read-back of the step counter.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::{AxisDriver, DriveCommand, DriveError, DriveInputs};
use crate::engine::limits::{LimitCapture, LimitSide};

/// Simulated axis geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimAxisConfig {
    /// Step counter at power-up.
    pub start_position: i32,
    /// Switch trips at `position <= min_switch`.
    pub min_switch: Option<i32>,
    /// Switch trips at `position >= max_switch`.
    pub max_switch: Option<i32>,
}

impl SimAxisConfig {
    /// Switches at both ends of `travel` steps, starting mid-travel.
    pub fn with_travel(travel: i32) -> Self {
        Self {
            start_position: travel / 2,
            min_switch: Some(0),
            max_switch: Some(travel),
        }
    }
}

#[derive(Debug)]
struct SimState {
    config: SimAxisConfig,
    position: i32,
    enabled: bool,
    stalled: bool,
    alarm: bool,
    min_active: bool,
    max_active: bool,
    steps_travelled: u64,
}

impl SimState {
    fn update_switches(&mut self, capture: &LimitCapture) {
        let min_now = self.config.min_switch.is_some_and(|s| self.position <= s);
        let max_now = self.config.max_switch.is_some_and(|s| self.position >= s);
        if min_now && !self.min_active {
            trace!(position = self.position, "sim: min switch edge");
            capture.on_edge(LimitSide::Min);
        }
        if max_now && !self.max_active {
            trace!(position = self.position, "sim: max switch edge");
            capture.on_edge(LimitSide::Max);
        }
        self.min_active = min_now;
        self.max_active = max_now;
    }
}

pub struct SimulatedAxis {
    state: Arc<Mutex<SimState>>,
    capture: Arc<LimitCapture>,
}

impl SimulatedAxis {
    pub fn new(config: SimAxisConfig, capture: Arc<LimitCapture>) -> Self {
        let mut state = SimState {
            config,
            position: config.start_position,
            enabled: false,
            stalled: false,
            alarm: false,
            min_active: false,
            max_active: false,
            steps_travelled: 0,
        };
        // Levels at power-up are not edges.
        state.min_active = config.min_switch.is_some_and(|s| state.position <= s);
        state.max_active = config.max_switch.is_some_and(|s| state.position >= s);
        Self {
            state: Arc::new(Mutex::new(state)),
            capture,
        }
    }

    pub fn handle(&self) -> SimHandle {
        SimHandle {
            state: Arc::clone(&self.state),
            capture: Arc::clone(&self.capture),
        }
    }
}

impl AxisDriver for SimulatedAxis {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn init(&mut self) -> Result<(), DriveError> {
        let state = self.state.lock();
        debug!(
            position = state.position,
            min_switch = ?state.config.min_switch,
            max_switch = ?state.config.max_switch,
            "simulated axis ready"
        );
        Ok(())
    }

    fn sample(&mut self) -> DriveInputs {
        let state = self.state.lock();
        DriveInputs {
            position: state.position,
            limit_min: state.min_active,
            limit_max: state.max_active,
            alarm: state.alarm,
        }
    }

    fn apply(&mut self, command: &DriveCommand, _dt: Duration) {
        let mut state = self.state.lock();
        state.enabled = command.enabled;
        if command.enabled && !state.stalled && command.position != state.position {
            state.steps_travelled += u64::from(command.position.abs_diff(state.position));
            state.position = command.position;
        }
        state.update_switches(&self.capture);
    }

    fn shutdown(&mut self) -> Result<(), DriveError> {
        self.state.lock().enabled = false;
        Ok(())
    }
}

/// Test and bench access to a [`SimulatedAxis`].
#[derive(Clone)]
pub struct SimHandle {
    state: Arc<Mutex<SimState>>,
    capture: Arc<LimitCapture>,
}

impl SimHandle {
    /// Raw step counter.
    pub fn position(&self) -> i32 {
        self.state.lock().position
    }

    /// Total steps emitted since start.
    pub fn steps_travelled(&self) -> u64 {
        self.state.lock().steps_travelled
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    pub fn limit_levels(&self) -> (bool, bool) {
        let state = self.state.lock();
        (state.min_active, state.max_active)
    }

    pub fn set_alarm(&self, active: bool) {
        self.state.lock().alarm = active;
    }

    /// A stalled motor ignores step commands.
    pub fn set_stalled(&self, stalled: bool) {
        self.state.lock().stalled = stalled;
    }

    /// Fire an edge interrupt without touching the switch level.
    pub fn inject_edge(&self, side: LimitSide) {
        self.capture.on_edge(side);
    }

    /// Move a switch; the level updates on the next `apply`.
    pub fn set_switches(&self, min_switch: Option<i32>, max_switch: Option<i32>) {
        let mut state = self.state.lock();
        state.config.min_switch = min_switch;
        state.config.max_switch = max_switch;
    }
}
