//! Engine state and the status snapshot shared with every reader.

use super::error::FaultFlags;
use super::motion::PositionLimits;

// ─── System State ───────────────────────────────────────────────────

/// Motion engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum SystemState {
    /// Constructed, first tick not yet run.
    #[default]
    Init = 0,
    /// Ready for moves within configured limits; range not discovered.
    NotHomed = 1,
    /// Range discovery in progress.
    Homing = 2,
    /// Homed and at standstill.
    Ready = 3,
    /// Executing a move.
    Moving = 4,
    /// Recoverable fault; only `Home` leaves this state.
    Error = 5,
    /// Latched emergency stop; only `Home` leaves this state.
    EmergencyStop = 6,
}

impl SystemState {
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Init),
            1 => Some(Self::NotHomed),
            2 => Some(Self::Homing),
            3 => Some(Self::Ready),
            4 => Some(Self::Moving),
            5 => Some(Self::Error),
            6 => Some(Self::EmergencyStop),
            _ => None,
        }
    }

    /// Whether the state refuses motion commands.
    #[inline]
    pub const fn is_faulted(self) -> bool {
        matches!(self, Self::Error | Self::EmergencyStop)
    }
}

/// Whether the protocol decoder is receiving valid frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum LinkState {
    #[default]
    Down = 0,
    Up = 1,
}

impl LinkState {
    pub const fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Up,
            _ => Self::Down,
        }
    }
}

// ─── Status Snapshot ────────────────────────────────────────────────

/// Copy of everything the engine and decoder publish.
///
/// The engine writes every field except `link`, which belongs to the decoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemStatus {
    /// Current position [steps] in the homed frame.
    pub current_position: i32,
    /// Active target [steps].
    pub target_position: i32,
    /// Signed velocity [steps/s].
    pub current_speed: f64,
    pub enabled: bool,
    pub limit_min_active: bool,
    pub limit_max_active: bool,
    pub state: SystemState,
    pub homed: bool,
    pub link: LinkState,
    pub faults: FaultFlags,
    /// Homing progress, 0..=100.
    pub homing_progress: u8,
    pub position_limits: PositionLimits,
    /// Id of the last command the engine dequeued (0 = none yet).
    pub last_command_id: u32,
}

impl SystemStatus {
    pub const fn new(limits: PositionLimits) -> Self {
        Self {
            current_position: 0,
            target_position: 0,
            current_speed: 0.0,
            enabled: false,
            limit_min_active: false,
            limit_max_active: false,
            state: SystemState::Init,
            homed: false,
            link: LinkState::Down,
            faults: FaultFlags::empty(),
            homing_progress: 0,
            position_limits: limits,
            last_command_id: 0,
        }
    }

    #[inline]
    pub fn is_faulted(&self) -> bool {
        self.state.is_faulted()
    }

    #[inline]
    pub fn is_moving(&self) -> bool {
        matches!(self.state, SystemState::Moving | SystemState::Homing)
    }

    #[inline]
    pub fn is_limit_fault_active(&self) -> bool {
        self.faults.has_limit_fault()
    }

    /// Homed, not homing and not faulted.
    #[inline]
    pub fn accepts_positioning(&self) -> bool {
        self.homed && !self.is_faulted() && self.state != SystemState::Homing
    }

    /// Remaining distance to the active target [steps].
    #[inline]
    pub fn distance_to_go(&self) -> i32 {
        self.target_position - self.current_position
    }
}

impl Default for SystemStatus {
    fn default() -> Self {
        Self::new(PositionLimits::new(0, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_roundtrip_from_u8() {
        for v in 0..=6u8 {
            assert_eq!(SystemState::from_u8(v).map(|s| s as u8), Some(v));
        }
        assert_eq!(SystemState::from_u8(7), None);
    }

    #[test]
    fn unknown_link_byte_is_down() {
        assert_eq!(LinkState::from_u8(1), LinkState::Up);
        assert_eq!(LinkState::from_u8(9), LinkState::Down);
    }

    #[test]
    fn positioning_requires_homed_and_healthy() {
        let mut s = SystemStatus::default();
        assert!(!s.accepts_positioning());
        s.homed = true;
        s.state = SystemState::Ready;
        assert!(s.accepts_positioning());
        s.state = SystemState::Error;
        assert!(!s.accepts_positioning());
        s.state = SystemState::Homing;
        assert!(!s.accepts_positioning());
    }

    #[test]
    fn distance_to_go_is_signed() {
        let s = SystemStatus {
            current_position: 100,
            target_position: 40,
            ..SystemStatus::default()
        };
        assert_eq!(s.distance_to_go(), -60);
    }
}
