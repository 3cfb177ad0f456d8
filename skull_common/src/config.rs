//! TOML configuration loading shared by every SkullStepper binary.
//!
//! Any `serde`-deserializable struct picks up [`ConfigLoader`] through a
//! blanket implementation. Types that also implement [`Validate`] get a
//! one-call `load_validated` that rejects out-of-range values before the
//! caller ever sees them.
//!
//! # Usage
//!
//! ```rust,no_run
//! use skull_common::config::{ConfigError, ConfigLoader};
//! use skull_common::control::config::CoreConfig;
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = CoreConfig::load_validated(Path::new("skull.toml"))?;
//!     println!("service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Configuration file not found at the given path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// The file could not be read or is not valid TOML for the target type.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// A value is syntactically fine but outside its accepted range.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log verbosity, lowercase in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Fields common to every SkullStepper process.
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "skull-left-eye"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedConfig {
    #[serde(default)]
    pub log_level: LogLevel,

    /// Instance identifier, used in log output.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    "skull-core".to_string()
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

impl SharedConfig {
    /// Rejects an empty `service_name`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "shared.service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Semantic validation hook used by [`ConfigLoader::load_validated`].
pub trait Validate {
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Loads configuration from TOML files or strings.
///
/// - `ConfigError::FileNotFound` when the file does not exist
/// - `ConfigError::ParseError` for I/O failures and TOML syntax/type errors
/// - `ConfigError::ValidationError` from `load_validated` when bounds fail
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Parse a TOML document.
    fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Read and parse a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;
        Self::from_toml_str(&content)
    }

    /// Read, parse and validate a TOML file.
    fn load_validated(path: &Path) -> Result<Self, ConfigError>
    where
        Self: Validate,
    {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

/// Checks `value` against an inclusive range, naming the field on failure.
pub fn check_range<T>(field: &str, value: T, min: T, max: T) -> Result<(), ConfigError>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if value < min || value > max {
        return Err(ConfigError::ValidationError(format!(
            "{field} = {value} is outside [{min}, {max}]"
        )));
    }
    Ok(())
}
