//! Kinematic limits: velocity profile and travel range.

use serde::{Deserialize, Serialize};

use crate::consts::{ACCEL_MAX, ACCEL_MIN, SPEED_MAX, SPEED_MIN};

// ─── Motion Profile ─────────────────────────────────────────────────

/// Speed and ramp limits applied by the planner [steps/s, steps/s²].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionProfile {
    pub max_speed: f64,
    pub acceleration: f64,
    pub deceleration: f64,
}

impl MotionProfile {
    pub const fn new(max_speed: f64, acceleration: f64, deceleration: f64) -> Self {
        Self {
            max_speed,
            acceleration,
            deceleration,
        }
    }

    /// Applies a per-command override.
    ///
    /// Overridden values are clamped into the global parameter bounds and
    /// never exceed this profile; an acceleration override also sets the
    /// deceleration, so a command cannot brake harder than it accelerates.
    pub fn with_override(&self, ov: &ProfileOverride) -> Self {
        let mut out = *self;
        if let Some(speed) = ov.max_speed {
            out.max_speed = speed.clamp(SPEED_MIN, SPEED_MAX).min(self.max_speed);
        }
        if let Some(accel) = ov.acceleration {
            let accel = accel.clamp(ACCEL_MIN, ACCEL_MAX);
            out.acceleration = accel.min(self.acceleration);
            out.deceleration = accel.min(self.deceleration);
        }
        out
    }
}

/// Optional speed / acceleration carried by a single command.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProfileOverride {
    pub max_speed: Option<f64>,
    pub acceleration: Option<f64>,
}

impl ProfileOverride {
    pub const NONE: Self = Self {
        max_speed: None,
        acceleration: None,
    };

    pub const fn new(max_speed: f64, acceleration: f64) -> Self {
        Self {
            max_speed: Some(max_speed),
            acceleration: Some(acceleration),
        }
    }
}

// ─── Position Limits ────────────────────────────────────────────────

/// Usable travel [steps], inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionLimits {
    pub min: i32,
    pub max: i32,
}

impl PositionLimits {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Travel length `max − min` (0 for an inverted pair).
    #[inline]
    pub const fn range(&self) -> i32 {
        if self.max > self.min {
            self.max - self.min
        } else {
            0
        }
    }

    #[inline]
    pub const fn contains(&self, position: i32) -> bool {
        position >= self.min && position <= self.max
    }

    #[inline]
    pub fn clamp(&self, position: i32) -> i32 {
        position.clamp(self.min, self.max.max(self.min))
    }

    /// Position at `percent` of the range, in integer arithmetic.
    pub fn at_percent(&self, percent: u8) -> i32 {
        let pct = i64::from(percent.min(100));
        let offset = i64::from(self.range()) * pct / 100;
        self.min + offset as i32
    }

    /// Position at `value / full_scale` of the range, rounded to nearest.
    pub fn at_fraction(&self, value: u32, full_scale: u32) -> i32 {
        if full_scale == 0 {
            return self.min;
        }
        let value = u64::from(value.min(full_scale));
        let scale = u64::from(full_scale);
        let offset = (u64::from(self.range() as u32) * value + scale / 2) / scale;
        self.min + offset as i32
    }
}
