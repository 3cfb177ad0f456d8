//! Configuration model for the motion core.
//!
//! Every section is optional in TOML; missing fields take the defaults from
//! [`crate::consts`]. Numeric parameters are range-checked by
//! [`CoreConfig::validate`], which names the offending field.
//!
//! ```toml
//! [shared]
//! service_name = "skull-left-eye"
//!
//! [motion]
//! max_speed = 4000.0
//!
//! [homing]
//! home_position_percent = 30
//!
//! [decoder]
//! base_channel = 17
//! position_16bit = true
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SharedConfig, Validate, check_range};
use crate::consts::*;

use super::motion::{MotionProfile, PositionLimits};

// ─── Top-Level Config ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CoreConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub homing: HomingConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
}

impl Validate for CoreConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.engine.validate()?;
        self.motion.validate()?;
        self.limits.validate()?;
        self.homing.validate()?;
        self.decoder.validate()?;
        Ok(())
    }
}

impl CoreConfig {
    /// Default motion profile.
    pub fn profile(&self) -> MotionProfile {
        MotionProfile::new(
            self.motion.max_speed,
            self.motion.acceleration,
            self.motion.deceleration,
        )
    }

    /// Travel limits in force before homing.
    pub fn position_limits(&self) -> PositionLimits {
        PositionLimits::new(self.limits.min_position, self.limits.max_position)
    }
}

// ─── Engine ─────────────────────────────────────────────────────────

/// Reaction to a limit switch hit outside homing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LimitAction {
    /// Stop generating steps in the same tick.
    #[default]
    Halt,
    /// Ramp down at the configured deceleration.
    Decelerate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine tick period [µs].
    #[serde(default = "default_engine_cycle")]
    pub cycle_time_us: u32,

    /// Usable depth of the command queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Bounded wait on the status lock before skipping a publish [µs].
    #[serde(default = "default_status_lock_timeout")]
    pub status_lock_timeout_us: u64,

    /// Minimum spacing between accepted limit switch edges [ms].
    #[serde(default = "default_limit_debounce")]
    pub limit_debounce_ms: u32,

    #[serde(default)]
    pub limit_action: LimitAction,

    /// Largest tolerated |actual − commanded| [steps]; 0 disables the check.
    #[serde(default = "default_following_error")]
    pub following_error_limit: u32,

    /// Energize the drive on the first tick.
    #[serde(default = "default_true")]
    pub enable_on_start: bool,

    /// Queue a `Home` on the first tick.
    #[serde(default)]
    pub auto_home_on_boot: bool,
}

fn default_engine_cycle() -> u32 {
    ENGINE_CYCLE_US
}
fn default_queue_capacity() -> usize {
    QUEUE_CAPACITY_DEFAULT
}
fn default_status_lock_timeout() -> u64 {
    STATUS_LOCK_TIMEOUT_US
}
fn default_limit_debounce() -> u32 {
    LIMIT_DEBOUNCE_MS
}
fn default_following_error() -> u32 {
    50
}
fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cycle_time_us: default_engine_cycle(),
            queue_capacity: default_queue_capacity(),
            status_lock_timeout_us: default_status_lock_timeout(),
            limit_debounce_ms: default_limit_debounce(),
            limit_action: LimitAction::default(),
            following_error_limit: default_following_error(),
            enable_on_start: true,
            auto_home_on_boot: false,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "engine.cycle_time_us",
            self.cycle_time_us,
            CYCLE_TIME_US_MIN,
            CYCLE_TIME_US_MAX,
        )?;
        check_range("engine.queue_capacity", self.queue_capacity, 1, QUEUE_CAPACITY_MAX)?;
        check_range(
            "engine.status_lock_timeout_us",
            self.status_lock_timeout_us,
            1,
            u64::from(self.cycle_time_us),
        )?;
        check_range(
            "engine.limit_debounce_ms",
            self.limit_debounce_ms,
            0,
            LIMIT_DEBOUNCE_MS_MAX,
        )?;
        Ok(())
    }
}

// ─── Motion ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    #[serde(default = "default_max_speed")]
    pub max_speed: f64,
    #[serde(default = "default_acceleration")]
    pub acceleration: f64,
    #[serde(default = "default_acceleration")]
    pub deceleration: f64,
}

fn default_max_speed() -> f64 {
    DEFAULT_MAX_SPEED
}
fn default_acceleration() -> f64 {
    DEFAULT_ACCELERATION
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            max_speed: DEFAULT_MAX_SPEED,
            acceleration: DEFAULT_ACCELERATION,
            deceleration: DEFAULT_ACCELERATION,
        }
    }
}

impl MotionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("motion.max_speed", self.max_speed, SPEED_MIN, SPEED_MAX)?;
        check_range("motion.acceleration", self.acceleration, ACCEL_MIN, ACCEL_MAX)?;
        check_range("motion.deceleration", self.deceleration, ACCEL_MIN, ACCEL_MAX)?;
        Ok(())
    }
}

// ─── Limits ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default)]
    pub min_position: i32,
    #[serde(default = "default_max_position")]
    pub max_position: i32,
}

fn default_max_position() -> i32 {
    DEFAULT_MAX_POSITION
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            min_position: 0,
            max_position: DEFAULT_MAX_POSITION,
        }
    }
}

impl LimitsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_position <= self.min_position {
            return Err(ConfigError::ValidationError(format!(
                "limits.max_position ({}) must exceed limits.min_position ({})",
                self.max_position, self.min_position
            )));
        }
        Ok(())
    }
}

// ─── Homing ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomingConfig {
    /// Search speed toward each switch [steps/s].
    #[serde(default = "default_homing_speed")]
    pub speed: f64,

    /// Distance to move off a switch after its edge [steps].
    #[serde(default = "default_backoff")]
    pub backoff_steps: i32,

    /// Margin kept inside the discovered range on both ends [steps].
    #[serde(default = "default_limit_margin")]
    pub limit_margin: i32,

    /// Park position after homing, as a percentage of the range.
    #[serde(default = "default_home_percent")]
    pub home_position_percent: u8,

    /// Shortest acceptable usable range [steps].
    #[serde(default = "default_min_range")]
    pub min_usable_range: i32,

    /// Per-phase timeout [ms].
    #[serde(default = "default_homing_timeout")]
    pub timeout_ms: u32,
}

fn default_homing_speed() -> f64 {
    HOMING_SPEED_DEFAULT
}
fn default_backoff() -> i32 {
    HOMING_BACKOFF_DEFAULT
}
fn default_limit_margin() -> i32 {
    LIMIT_MARGIN_DEFAULT
}
fn default_home_percent() -> u8 {
    HOME_POSITION_PERCENT_DEFAULT
}
fn default_min_range() -> i32 {
    MIN_USABLE_RANGE_DEFAULT
}
fn default_homing_timeout() -> u32 {
    HOMING_TIMEOUT_MS
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            speed: HOMING_SPEED_DEFAULT,
            backoff_steps: HOMING_BACKOFF_DEFAULT,
            limit_margin: LIMIT_MARGIN_DEFAULT,
            home_position_percent: HOME_POSITION_PERCENT_DEFAULT,
            min_usable_range: MIN_USABLE_RANGE_DEFAULT,
            timeout_ms: HOMING_TIMEOUT_MS,
        }
    }
}

impl HomingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("homing.speed", self.speed, HOMING_SPEED_MIN, HOMING_SPEED_MAX)?;
        check_range("homing.backoff_steps", self.backoff_steps, 0, LIMIT_MARGIN_MAX)?;
        check_range("homing.limit_margin", self.limit_margin, 0, LIMIT_MARGIN_MAX)?;
        check_range("homing.home_position_percent", self.home_position_percent, 0, 100)?;
        check_range("homing.min_usable_range", self.min_usable_range, 1, i32::MAX)?;
        check_range("homing.timeout_ms", self.timeout_ms, 100, 600_000)?;
        Ok(())
    }
}

// ─── Decoder ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// First consumed channel, 1-based.
    #[serde(default = "default_base_channel")]
    pub base_channel: u16,

    /// Link timeout [ms].
    #[serde(default = "default_link_timeout")]
    pub timeout_ms: u32,

    /// Decoder tick period [µs].
    #[serde(default = "default_decoder_cycle")]
    pub cycle_time_us: u32,

    /// Combine high and low position bytes.
    #[serde(default)]
    pub position_16bit: bool,

    /// Nominal Stop/Control boundary on the mode byte.
    #[serde(default = "default_mode_boundary")]
    pub stop_control_boundary: u8,

    /// Margin the mode byte must clear past the boundary.
    #[serde(default = "default_mode_hysteresis")]
    pub mode_hysteresis: u8,

    /// Consecutive full-scale mode frames needed to enter Home.
    #[serde(default = "default_home_confirm")]
    pub home_confirm_frames: u8,

    /// Position change that justifies a new command [steps].
    #[serde(default = "default_position_threshold")]
    pub position_threshold: u32,

    /// Speed/acceleration byte change that justifies a new command.
    #[serde(default = "default_profile_threshold")]
    pub profile_threshold: u8,

    /// Resend the current target after this long without emitting [ms].
    #[serde(default = "default_idle_resend")]
    pub idle_resend_ms: u32,

    /// Resend when the settled engine is this far from the target [steps].
    #[serde(default = "default_divergence")]
    pub divergence_tolerance: u32,

    /// Speed floor for the lowest speed byte [steps/s].
    #[serde(default = "default_min_speed")]
    pub min_speed: f64,

    /// Acceleration floor for the lowest acceleration byte [steps/s²].
    #[serde(default = "default_min_acceleration")]
    pub min_acceleration: f64,
}

fn default_base_channel() -> u16 {
    1
}
fn default_link_timeout() -> u32 {
    LINK_TIMEOUT_MS_DEFAULT
}
fn default_decoder_cycle() -> u32 {
    DECODER_CYCLE_US
}
fn default_mode_boundary() -> u8 {
    MODE_BOUNDARY_DEFAULT
}
fn default_mode_hysteresis() -> u8 {
    MODE_HYSTERESIS_DEFAULT
}
fn default_home_confirm() -> u8 {
    HOME_CONFIRM_FRAMES_DEFAULT
}
fn default_position_threshold() -> u32 {
    2
}
fn default_profile_threshold() -> u8 {
    2
}
fn default_idle_resend() -> u32 {
    1000
}
fn default_divergence() -> u32 {
    5
}
fn default_min_speed() -> f64 {
    50.0
}
fn default_min_acceleration() -> f64 {
    100.0
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_channel: default_base_channel(),
            timeout_ms: LINK_TIMEOUT_MS_DEFAULT,
            cycle_time_us: DECODER_CYCLE_US,
            position_16bit: false,
            stop_control_boundary: MODE_BOUNDARY_DEFAULT,
            mode_hysteresis: MODE_HYSTERESIS_DEFAULT,
            home_confirm_frames: HOME_CONFIRM_FRAMES_DEFAULT,
            position_threshold: default_position_threshold(),
            profile_threshold: default_profile_threshold(),
            idle_resend_ms: default_idle_resend(),
            divergence_tolerance: default_divergence(),
            min_speed: default_min_speed(),
            min_acceleration: default_min_acceleration(),
        }
    }
}

impl DecoderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("decoder.base_channel", self.base_channel, 1, MAX_BASE_CHANNEL)?;
        check_range(
            "decoder.timeout_ms",
            self.timeout_ms,
            LINK_TIMEOUT_MS_MIN,
            LINK_TIMEOUT_MS_MAX,
        )?;
        check_range(
            "decoder.cycle_time_us",
            self.cycle_time_us,
            CYCLE_TIME_US_MIN,
            CYCLE_TIME_US_MAX,
        )?;
        // Both bands must stay reachable: Stop at boundary − hysteresis and
        // Control at boundary + hysteresis, below the Home value.
        let hyst = u16::from(self.mode_hysteresis);
        let boundary = u16::from(self.stop_control_boundary);
        if hyst > boundary || boundary + hyst >= u16::from(MODE_HOME_VALUE) {
            return Err(ConfigError::ValidationError(format!(
                "decoder.mode_hysteresis ({hyst}) does not fit around boundary {boundary}"
            )));
        }
        check_range("decoder.home_confirm_frames", self.home_confirm_frames, 1, 50)?;
        check_range("decoder.min_speed", self.min_speed, SPEED_MIN, SPEED_MAX)?;
        check_range(
            "decoder.min_acceleration",
            self.min_acceleration,
            ACCEL_MIN,
            ACCEL_MAX,
        )?;
        Ok(())
    }
}
