//! Configuration access for the periodic tasks, with hot reload.
//!
//! The active [`CoreConfig`] lives behind an `Arc` that is swapped as a
//! whole. Each tick takes one snapshot up front and works from it, so an
//! update landing between ticks can never be observed half-applied.
//!
//! ## Reload pipeline
//! 1. Parse the shadow config (TOML).
//! 2. Full validation, same rules as startup.
//! 3. Scope check: cycle periods and queue depth are fixed at start.
//! 4. Swap the `Arc` and bump the generation counter.
//!
//! Any failure leaves the active config untouched.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{info, warn};

use skull_common::config::{ConfigError, ConfigLoader, Validate};
use skull_common::control::config::CoreConfig;

/// Load and validate the core config from a TOML file.
pub fn load_config(path: &Path) -> Result<CoreConfig, ConfigError> {
    let config = CoreConfig::load_validated(path)?;
    info!(
        path = %path.display(),
        service = %config.shared.service_name,
        "configuration loaded"
    );
    Ok(config)
}

/// Outcome of a hot reload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadResult {
    /// New config is active.
    Success,
    /// Parse or validation failed; active config unchanged.
    ValidationFailed(String),
    /// A start-time-only field changed; active config unchanged.
    ScopeViolation(String),
}

/// Shared, hot-swappable configuration.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    active: Arc<RwLock<Arc<CoreConfig>>>,
    generation: Arc<AtomicU64>,
}

impl ConfigHandle {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            active: Arc::new(RwLock::new(Arc::new(config))),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The config in force right now.
    #[inline]
    pub fn snapshot(&self) -> Arc<CoreConfig> {
        Arc::clone(&self.active.read())
    }

    /// Incremented on every successful swap.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Validate `shadow` and make it active.
    pub fn replace(&self, shadow: CoreConfig) -> ReloadResult {
        if let Err(e) = shadow.validate() {
            warn!("config reload rejected: {e}");
            return ReloadResult::ValidationFailed(e.to_string());
        }
        let current = self.snapshot();
        if let Err(reason) = check_reload_scope(&current, &shadow) {
            warn!("config reload rejected: {reason}");
            return ReloadResult::ScopeViolation(reason);
        }
        *self.active.write() = Arc::new(shadow);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        info!(generation, "config reloaded");
        ReloadResult::Success
    }

    /// Parse a TOML document and [`replace`](Self::replace) with it.
    pub fn reload_from_str(&self, toml: &str) -> ReloadResult {
        match CoreConfig::from_toml_str(toml) {
            Ok(shadow) => self.replace(shadow),
            Err(e) => {
                warn!("config reload rejected: {e}");
                ReloadResult::ValidationFailed(e.to_string())
            }
        }
    }

    /// Read a TOML file and [`replace`](Self::replace) with it.
    pub fn reload_from_file(&self, path: &Path) -> ReloadResult {
        match CoreConfig::load(path) {
            Ok(shadow) => self.replace(shadow),
            Err(e) => ReloadResult::ValidationFailed(e.to_string()),
        }
    }
}

/// Fields that size buffers or pace threads cannot change at runtime.
fn check_reload_scope(active: &CoreConfig, shadow: &CoreConfig) -> Result<(), String> {
    if active.engine.cycle_time_us != shadow.engine.cycle_time_us {
        return Err(format!(
            "engine.cycle_time_us changed: {} → {} (requires restart)",
            active.engine.cycle_time_us, shadow.engine.cycle_time_us
        ));
    }
    if active.decoder.cycle_time_us != shadow.decoder.cycle_time_us {
        return Err(format!(
            "decoder.cycle_time_us changed: {} → {} (requires restart)",
            active.decoder.cycle_time_us, shadow.decoder.cycle_time_us
        ));
    }
    if active.engine.queue_capacity != shadow.engine.queue_capacity {
        return Err(format!(
            "engine.queue_capacity changed: {} → {} (requires restart)",
            active.engine.queue_capacity, shadow.engine.queue_capacity
        ));
    }
    Ok(())
}
