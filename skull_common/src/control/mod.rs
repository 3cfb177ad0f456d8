//! Types exchanged between the motion engine, the protocol decoder and
//! front-ends.

pub mod command;
pub mod config;
pub mod error;
pub mod frame;
pub mod motion;
pub mod status;

use static_assertions::const_assert_eq;

// Fixed-size values copied under short-held locks.
const_assert_eq!(core::mem::size_of::<frame::ControlFrame>(), crate::consts::CHANNEL_COUNT);
const_assert_eq!(core::mem::size_of::<status::SystemState>(), 1);
const_assert_eq!(core::mem::size_of::<frame::ControlMode>(), 1);
