//! System-wide constants for the SkullStepper workspace.
//!
//! Single source of truth for numeric limits and defaults. Configuration
//! validation and the decoder both read their bounds from here.

// ─── Cycle Timing ───────────────────────────────────────────────────

/// Default motion engine cycle time in microseconds (1 kHz).
pub const ENGINE_CYCLE_US: u32 = 1000;

/// Default protocol decoder cycle time in microseconds (200 Hz).
pub const DECODER_CYCLE_US: u32 = 5000;

/// Shortest accepted cycle time [µs].
pub const CYCLE_TIME_US_MIN: u32 = 100;

/// Longest accepted cycle time [µs].
pub const CYCLE_TIME_US_MAX: u32 = 100_000;

// ─── Command Bus ────────────────────────────────────────────────────

/// Hard capacity of the pre-allocated command queue.
pub const QUEUE_CAPACITY_MAX: usize = 32;

/// Default usable depth of the command queue.
pub const QUEUE_CAPACITY_DEFAULT: usize = 10;

/// Default bounded wait for the status record lock [µs].
pub const STATUS_LOCK_TIMEOUT_US: u64 = 200;

// ─── Motion Parameter Bounds ────────────────────────────────────────

/// Speed bounds [steps/s].
pub const SPEED_MIN: f64 = 1.0;
pub const SPEED_MAX: f64 = 20_000.0;

/// Acceleration / deceleration bounds [steps/s²].
pub const ACCEL_MIN: f64 = 1.0;
pub const ACCEL_MAX: f64 = 20_000.0;

/// Default maximum speed [steps/s].
pub const DEFAULT_MAX_SPEED: f64 = 5000.0;

/// Default acceleration and deceleration [steps/s²].
pub const DEFAULT_ACCELERATION: f64 = 5000.0;

/// Default travel before homing [steps].
pub const DEFAULT_MAX_POSITION: i32 = 800;

// ─── Limit Switches ─────────────────────────────────────────────────

/// Default debounce window for limit switch edges [ms].
pub const LIMIT_DEBOUNCE_MS: u32 = 100;

/// Upper bound on the limit debounce window [ms].
pub const LIMIT_DEBOUNCE_MS_MAX: u32 = 1000;

// ─── Homing ─────────────────────────────────────────────────────────

/// Homing speed bounds [steps/s].
pub const HOMING_SPEED_MIN: f64 = 10.0;
pub const HOMING_SPEED_MAX: f64 = 10_000.0;

/// Default homing speed [steps/s].
pub const HOMING_SPEED_DEFAULT: f64 = 500.0;

/// Default back-off distance after a switch edge [steps].
pub const HOMING_BACKOFF_DEFAULT: i32 = 50;

/// Default safety margin applied inside the discovered range [steps].
pub const LIMIT_MARGIN_DEFAULT: i32 = 10;

/// Upper bound for back-off and margin [steps].
pub const LIMIT_MARGIN_MAX: i32 = 10_000;

/// Default minimum usable travel after homing [steps].
pub const MIN_USABLE_RANGE_DEFAULT: i32 = 100;

/// Default per-phase homing timeout [ms].
pub const HOMING_TIMEOUT_MS: u32 = 30_000;

/// Default home position as a percentage of the discovered range.
pub const HOME_POSITION_PERCENT_DEFAULT: u8 = 50;

// ─── Protocol Decoder ───────────────────────────────────────────────

/// Number of channels in one DMX512 universe.
pub const UNIVERSE_SIZE: usize = 512;

/// Number of channels consumed from the universe.
pub const CHANNEL_COUNT: usize = 5;

/// Highest base channel that still fits all channels in the universe.
pub const MAX_BASE_CHANNEL: u16 = (UNIVERSE_SIZE - CHANNEL_COUNT + 1) as u16;

/// Link timeout bounds [ms].
pub const LINK_TIMEOUT_MS_MIN: u32 = 100;
pub const LINK_TIMEOUT_MS_MAX: u32 = 60_000;

/// Default link timeout [ms].
pub const LINK_TIMEOUT_MS_DEFAULT: u32 = 5000;

/// Default Stop/Control boundary on the mode byte.
pub const MODE_BOUNDARY_DEFAULT: u8 = 100;

/// Default hysteresis margin around the mode boundary.
pub const MODE_HYSTERESIS_DEFAULT: u8 = 5;

/// Default number of consecutive frames required to enter Home.
pub const HOME_CONFIRM_FRAMES_DEFAULT: u8 = 3;

/// Mode byte value reserved for Home.
pub const MODE_HOME_VALUE: u8 = u8::MAX;
