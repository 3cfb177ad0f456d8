mod support;

mod decoder_flow;
mod faults;
mod homing;
mod hot_reload;
mod motion;
