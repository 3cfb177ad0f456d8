//! # Skull Control
//!
//! Real-time core for a single stepper axis driven by two independent
//! sources: a DMX512 control frame and local front-ends.
//!
//! ## Components
//!
//! 1. **Bus** ([`bus`]): bounded command queue and the shared status record.
//! 2. **Motion engine** ([`engine`]): owns the axis, runs homing and the
//!    S-curve planner, reacts to limit switches and drive faults.
//! 3. **Protocol decoder** ([`decoder`]): filters control frames and turns
//!    them into motion commands.
//!
//! Engine and decoder run as independent fixed-period workers ([`cycle`])
//! wired together in [`runtime`]. Neither tick blocks: the only waits are
//! bounded lock acquisitions, and a timeout skips the update.

pub mod bus;
pub mod config;
pub mod cycle;
pub mod decoder;
pub mod drive;
pub mod engine;
pub mod runtime;
