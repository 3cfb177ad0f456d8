//! Motion commands accepted by the engine.
//!
//! A command is created once by a producer (decoder or front-end), stamped
//! with an id and a creation time, and consumed exactly once by the engine.
//! Fields are private so a queued command cannot be altered.

use super::motion::ProfileOverride;

/// What a command asks the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Move to an absolute step position.
    MoveAbsolute { target: i32 },
    /// Move by `delta` steps from the last commanded target.
    MoveRelative { delta: i32 },
    /// Run the range-discovery sequence. Accepted in every state.
    Home,
    /// Decelerate to standstill.
    Stop,
    /// Halt immediately and latch until the next `Home`.
    EmergencyStop,
    /// Energize the drive.
    Enable,
    /// De-energize the drive.
    Disable,
}

impl CommandKind {
    /// Whether this command requests motion to a position.
    #[inline]
    pub const fn is_move(&self) -> bool {
        matches!(self, Self::MoveAbsolute { .. } | Self::MoveRelative { .. })
    }

    /// Short label for logs.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::MoveAbsolute { .. } => "move_absolute",
            Self::MoveRelative { .. } => "move_relative",
            Self::Home => "home",
            Self::Stop => "stop",
            Self::EmergencyStop => "emergency_stop",
            Self::Enable => "enable",
            Self::Disable => "disable",
        }
    }
}

/// A stamped, immutable motion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionCommand {
    id: u32,
    timestamp_ms: u64,
    kind: CommandKind,
    profile: ProfileOverride,
}

impl MotionCommand {
    pub const fn new(id: u32, timestamp_ms: u64, kind: CommandKind, profile: ProfileOverride) -> Self {
        Self {
            id,
            timestamp_ms,
            kind,
            profile,
        }
    }

    /// Monotonically increasing id assigned by the command bus.
    #[inline]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Creation time [ms] on the bus clock.
    #[inline]
    pub const fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    #[inline]
    pub const fn kind(&self) -> CommandKind {
        self.kind
    }

    #[inline]
    pub const fn profile(&self) -> ProfileOverride {
        self.profile
    }
}
