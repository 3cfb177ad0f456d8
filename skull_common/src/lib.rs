//! SkullStepper Common Library
//!
//! Shared data model, constants and configuration loading for the
//! SkullStepper workspace.
//!
//! # Module Structure
//!
//! - [`control`] - Commands, status, control frame, motion limits and core config
//! - [`config`] - TOML loading traits and the `[shared]` section
//! - [`consts`] - Numeric limits and defaults
//! - [`prelude`] - Common re-exports

pub mod config;
pub mod consts;
pub mod control;
pub mod prelude;
