//! The 5-channel control frame and the mode it encodes.
//!
//! Channel layout relative to the base channel:
//!
//! | Offset | Channel             |
//! |--------|---------------------|
//! | 0      | position, high byte |
//! | 1      | position, low byte  |
//! | 2      | acceleration        |
//! | 3      | speed               |
//! | 4      | mode                |

use crate::consts::CHANNEL_COUNT;

pub const OFFSET_POSITION_HIGH: usize = 0;
pub const OFFSET_POSITION_LOW: usize = 1;
pub const OFFSET_ACCELERATION: usize = 2;
pub const OFFSET_SPEED: usize = 3;
pub const OFFSET_MODE: usize = 4;

/// Operating mode selected by the mode channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ControlMode {
    #[default]
    Stop = 0,
    Control = 1,
    Home = 2,
}

impl ControlMode {
    pub const fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Control,
            2 => Self::Home,
            _ => Self::Stop,
        }
    }
}

/// One snapshot of the five consumed channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ControlFrame([u8; CHANNEL_COUNT]);

impl ControlFrame {
    pub const fn new(bytes: [u8; CHANNEL_COUNT]) -> Self {
        Self(bytes)
    }

    /// Raw channel values in wire order.
    #[inline]
    pub const fn bytes(&self) -> [u8; CHANNEL_COUNT] {
        self.0
    }

    #[inline]
    pub const fn position_high(&self) -> u8 {
        self.0[OFFSET_POSITION_HIGH]
    }

    #[inline]
    pub const fn position_low(&self) -> u8 {
        self.0[OFFSET_POSITION_LOW]
    }

    #[inline]
    pub const fn acceleration(&self) -> u8 {
        self.0[OFFSET_ACCELERATION]
    }

    #[inline]
    pub const fn speed(&self) -> u8 {
        self.0[OFFSET_SPEED]
    }

    #[inline]
    pub const fn mode_byte(&self) -> u8 {
        self.0[OFFSET_MODE]
    }

    /// Known line-noise patterns: every channel at full scale, or exactly
    /// one channel at full scale with the other four at zero.
    pub fn is_corrupt(&self) -> bool {
        let full = self.0.iter().filter(|&&b| b == u8::MAX).count();
        let zero = self.0.iter().filter(|&&b| b == 0).count();
        full == CHANNEL_COUNT || (full == 1 && zero == CHANNEL_COUNT - 1)
    }
}

impl From<[u8; CHANNEL_COUNT]> for ControlFrame {
    fn from(bytes: [u8; CHANNEL_COUNT]) -> Self {
        Self(bytes)
    }
}
