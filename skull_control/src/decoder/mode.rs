//! Mode byte decoding with hysteresis.
//!
//! | Band    | Entered when                                   |
//! |---------|------------------------------------------------|
//! | Stop    | byte ≤ boundary − hysteresis (from Control)    |
//! | Control | byte ≥ boundary + hysteresis (from Stop)       |
//! | Home    | N consecutive frames at exactly 255            |
//!
//! Leaving Home uses the bare boundary: there is no neighbouring band to
//! flap against.

use skull_common::consts::MODE_HOME_VALUE;
use skull_common::control::config::DecoderConfig;
use skull_common::control::frame::ControlMode;

/// Band thresholds, taken from the decoder config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeBands {
    pub boundary: u8,
    pub hysteresis: u8,
    pub home_frames: u8,
}

impl ModeBands {
    pub fn from_config(config: &DecoderConfig) -> Self {
        Self {
            boundary: config.stop_control_boundary,
            hysteresis: config.mode_hysteresis,
            home_frames: config.home_confirm_frames.max(1),
        }
    }

    #[inline]
    fn control_entry(&self) -> u16 {
        u16::from(self.boundary) + u16::from(self.hysteresis)
    }

    #[inline]
    fn stop_entry(&self) -> u8 {
        self.boundary.saturating_sub(self.hysteresis)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModeDecoder {
    mode: ControlMode,
    home_run: u8,
}

impl ModeDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Back to Stop, forgetting any partial Home run.
    pub fn reset(&mut self) {
        self.mode = ControlMode::Stop;
        self.home_run = 0;
    }

    /// Feed the mode byte of one valid frame. Returns the new mode on a
    /// transition.
    pub fn feed(&mut self, byte: u8, bands: &ModeBands) -> Option<ControlMode> {
        if byte == MODE_HOME_VALUE {
            self.home_run = self.home_run.saturating_add(1);
            if self.home_run >= bands.home_frames && self.mode != ControlMode::Home {
                return self.enter(ControlMode::Home);
            }
            return None;
        }
        self.home_run = 0;

        let next = match self.mode {
            ControlMode::Home if byte >= bands.boundary => ControlMode::Control,
            ControlMode::Home => ControlMode::Stop,
            ControlMode::Stop if u16::from(byte) >= bands.control_entry() => ControlMode::Control,
            ControlMode::Control if byte <= bands.stop_entry() => ControlMode::Stop,
            current => current,
        };
        if next == self.mode {
            None
        } else {
            self.enter(next)
        }
    }

    fn enter(&mut self, mode: ControlMode) -> Option<ControlMode> {
        self.mode = mode;
        Some(mode)
    }
}
