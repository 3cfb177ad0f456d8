//! Common re-exports: `use skull_common::prelude::*;`.

use std::time::Duration;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig, Validate};
pub use crate::control::config::{
    CoreConfig, DecoderConfig, EngineConfig, HomingConfig, LimitAction, LimitsConfig,
    MotionConfig,
};

// ─── Data Model ─────────────────────────────────────────────────────
pub use crate::control::command::{CommandKind, MotionCommand};
pub use crate::control::error::FaultFlags;
pub use crate::control::frame::{ControlFrame, ControlMode};
pub use crate::control::motion::{MotionProfile, PositionLimits, ProfileOverride};
pub use crate::control::status::{LinkState, SystemState, SystemStatus};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{CHANNEL_COUNT, ENGINE_CYCLE_US, UNIVERSE_SIZE};

/// Default engine cycle as `Duration`.
pub const DEFAULT_ENGINE_CYCLE: Duration = Duration::from_micros(ENGINE_CYCLE_US as u64);
