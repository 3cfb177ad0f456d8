//! Stepper drive abstraction.
//!
//! The engine talks to the physical (or simulated) drive only through
//! [`AxisDriver`]. A tick first samples inputs, then applies one command.
//! The two calls are split so limit and alarm inputs are examined before
//! any queued command is processed.
//!
//! # Timing Contracts
//!
//! | Operation    | Max Duration | RT Constraint |
//! |--------------|--------------|---------------|
//! | `init()`     | unbounded    | None (pre-RT) |
//! | `sample()`   | cycle budget | **HARD**      |
//! | `apply()`    | cycle budget | **HARD**      |
//! | `shutdown()` | 1 second     | None (post-RT)|

pub mod simulated;

pub use simulated::{SimAxisConfig, SimHandle, SimulatedAxis};

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum DriveError {
    #[error("Drive initialization failed: {0}")]
    InitFailed(String),

    #[error("Drive communication error: {0}")]
    CommunicationError(String),
}

/// Setpoint sent to the drive each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveCommand {
    /// Absolute step position in the drive's own counter frame.
    pub position: i32,
    /// Planned velocity [steps/s], informational.
    pub velocity: f64,
    /// Outputs energized.
    pub enabled: bool,
}

/// Inputs read from the drive at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriveInputs {
    /// Actual step position in the drive's counter frame.
    pub position: i32,
    pub limit_min: bool,
    pub limit_max: bool,
    pub alarm: bool,
}

pub trait AxisDriver: Send {
    /// Driver identifier for logs.
    fn name(&self) -> &'static str;

    /// Called once before the first tick.
    fn init(&mut self) -> Result<(), DriveError>;

    /// Read position, switch levels and alarm. Must not block.
    fn sample(&mut self) -> DriveInputs;

    /// Drive toward `command.position` within `dt`. Must not block.
    fn apply(&mut self, command: &DriveCommand, dt: Duration);

    /// Called once after the last tick.
    fn shutdown(&mut self) -> Result<(), DriveError>;
}
