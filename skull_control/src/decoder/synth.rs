//! Control-mode command synthesis.
//!
//! Turns the cached frame into a `MoveAbsolute` with a profile override and
//! decides whether it is worth sending. Emission is rate-limited by change
//! thresholds, with an idle resend and a divergence check so the engine
//! still converges after long quiet periods or a dropped command.

use skull_common::control::config::{CoreConfig, DecoderConfig};
use skull_common::control::frame::ControlFrame;
use skull_common::control::motion::{MotionProfile, PositionLimits, ProfileOverride};
use skull_common::control::status::SystemStatus;

/// A move derived from one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthesizedMove {
    pub target: i32,
    pub speed: f64,
    pub acceleration: f64,
    speed_byte: u8,
    accel_byte: u8,
}

impl SynthesizedMove {
    pub fn profile(&self) -> ProfileOverride {
        ProfileOverride::new(self.speed, self.acceleration)
    }
}

#[derive(Debug, Clone, Copy)]
struct Emitted {
    target: i32,
    speed_byte: u8,
    accel_byte: u8,
    at_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct CommandSynth {
    last: Option<Emitted>,
    last_good_low: u8,
}

impl CommandSynth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the last emission so the next proposal is sent unconditionally.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Position as `(value, full_scale)`.
    ///
    /// In 16-bit mode a zero low byte under a non-zero high byte is treated
    /// as a stuck channel when a non-zero low byte was seen before; the last
    /// good low byte is used instead.
    pub fn position_fraction(&mut self, frame: &ControlFrame, use_16bit: bool) -> (u32, u32) {
        let high = frame.position_high();
        if !use_16bit {
            return (u32::from(high), u32::from(u8::MAX));
        }
        let mut low = frame.position_low();
        if low != 0 {
            self.last_good_low = low;
        } else if high != 0 && self.last_good_low != 0 {
            low = self.last_good_low;
        }
        ((u32::from(high) << 8) | u32::from(low), u32::from(u16::MAX))
    }

    /// Build the move for `frame`. Returns it only if it should be sent.
    pub fn propose(
        &mut self,
        frame: &ControlFrame,
        use_16bit: bool,
        status: &SystemStatus,
        config: &CoreConfig,
        now_ms: u64,
    ) -> Option<SynthesizedMove> {
        let (value, full_scale) = self.position_fraction(frame, use_16bit);
        let mv = build_move(
            frame,
            value,
            full_scale,
            status.position_limits,
            config.profile(),
            &config.decoder,
        );
        should_emit(self.last, &mv, status, &config.decoder, now_ms).then_some(mv)
    }

    /// Record a move that made it onto the bus.
    pub fn commit(&mut self, mv: &SynthesizedMove, now_ms: u64) {
        self.last = Some(Emitted {
            target: mv.target,
            speed_byte: mv.speed_byte,
            accel_byte: mv.accel_byte,
            at_ms: now_ms,
        });
    }
}

fn build_move(
    frame: &ControlFrame,
    value: u32,
    full_scale: u32,
    limits: PositionLimits,
    profile: MotionProfile,
    config: &DecoderConfig,
) -> SynthesizedMove {
    SynthesizedMove {
        target: limits.at_fraction(value, full_scale),
        speed: scale_byte(frame.speed(), config.min_speed, profile.max_speed),
        acceleration: scale_byte(
            frame.acceleration(),
            config.min_acceleration,
            profile.acceleration,
        ),
        speed_byte: frame.speed(),
        accel_byte: frame.acceleration(),
    }
}

/// Linear map of `byte` onto `[floor, max]`; the floor keeps a zero byte
/// from stalling the motor.
fn scale_byte(byte: u8, floor: f64, max: f64) -> f64 {
    let floor = floor.min(max);
    floor + (max - floor) * f64::from(byte) / f64::from(u8::MAX)
}

fn should_emit(
    last: Option<Emitted>,
    mv: &SynthesizedMove,
    status: &SystemStatus,
    config: &DecoderConfig,
    now_ms: u64,
) -> bool {
    let Some(last) = last else {
        return true;
    };
    let moved = mv.target.abs_diff(last.target) > config.position_threshold;
    let reprofiled = mv.speed_byte.abs_diff(last.speed_byte) >= config.profile_threshold
        || mv.accel_byte.abs_diff(last.accel_byte) >= config.profile_threshold;
    let idle = now_ms.saturating_sub(last.at_ms) >= u64::from(config.idle_resend_ms);
    let diverged = !status.is_moving()
        && status.current_position.abs_diff(last.target) > config.divergence_tolerance;
    moved || reprofiled || idle || diverged
}
