//! Shared test rig: engine + decoder + simulated axis, ticked by hand.

use std::sync::Arc;

use skull_common::prelude::*;
use skull_control::bus::{CommandBus, StatusBoard};
use skull_control::config::ConfigHandle;
use skull_control::decoder::universe::SharedUniverse;
use skull_control::decoder::{DecoderHandle, ProtocolDecoder};
use skull_control::drive::{SimAxisConfig, SimHandle, SimulatedAxis};
use skull_control::engine::MotionEngine;
use skull_control::engine::limits::LimitCapture;
use skull_control::runtime::assemble;

/// Engine ticks per decoder tick (1 ms vs 5 ms).
pub const DECODER_EVERY: u64 = 5;

/// Homing with a 50-step back-off and margin, parking at 50%.
pub fn test_config() -> CoreConfig {
    let mut config = CoreConfig::default();
    config.homing.speed = 500.0;
    config.homing.backoff_steps = 50;
    config.homing.limit_margin = 50;
    config.homing.home_position_percent = 50;
    config.homing.min_usable_range = 100;
    config
}

/// Switches at raw −1000 and 3050: 4000 steps past the zero reference.
pub fn test_axis() -> SimAxisConfig {
    SimAxisConfig {
        start_position: 0,
        min_switch: Some(-1000),
        max_switch: Some(3050),
    }
}

pub struct Rig {
    pub engine: MotionEngine,
    pub decoder: ProtocolDecoder,
    pub bus: Arc<CommandBus>,
    pub status: Arc<StatusBoard>,
    pub sim: SimHandle,
    pub universe: SharedUniverse,
    pub config: ConfigHandle,
    ticks: u64,
}

impl Rig {
    pub fn new(config: CoreConfig, axis: SimAxisConfig) -> Self {
        let config = ConfigHandle::new(config);
        let capture = Arc::new(LimitCapture::new());
        let drive = SimulatedAxis::new(axis, Arc::clone(&capture));
        let sim = drive.handle();
        let universe = SharedUniverse::new();
        let parts = assemble(
            config.clone(),
            Box::new(drive),
            capture,
            Box::new(universe.reader()),
        );
        Self {
            engine: parts.engine,
            decoder: parts.decoder,
            bus: parts.bus,
            status: parts.status,
            sim,
            universe,
            config,
            ticks: 0,
        }
    }

    pub fn standard() -> Self {
        Self::new(test_config(), test_axis())
    }

    pub fn decoder_handle(&self) -> DecoderHandle {
        self.decoder.handle()
    }

    /// One engine tick, plus a decoder tick every fifth. Simulated time
    /// advances 1 ms per engine tick.
    pub fn tick(&mut self) {
        self.ticks += 1;
        self.engine.tick_at(self.ticks);
        if self.ticks % DECODER_EVERY == 0 {
            self.decoder.tick_at(self.ticks);
        }
    }

    pub fn run(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Tick until `done` holds for the published status.
    pub fn run_until(&mut self, max_ticks: u32, mut done: impl FnMut(&SystemStatus) -> bool) -> bool {
        for _ in 0..max_ticks {
            self.tick();
            if done(&self.status.snapshot()) {
                return true;
            }
        }
        false
    }

    pub fn send(&self, kind: CommandKind) -> bool {
        self.bus.send(kind)
    }

    pub fn status(&self) -> SystemStatus {
        self.status.snapshot()
    }

    /// Tick until the engine has dequeued everything and stands still.
    pub fn settle(&mut self) -> bool {
        self.run_until(30_000, |s| {
            !s.is_moving() && s.current_speed == 0.0 && s.distance_to_go() == 0
        }) && self.bus.queue().is_empty()
    }

    /// Run a full homing cycle and require it to succeed.
    pub fn home(&mut self) {
        assert!(self.send(CommandKind::Home));
        let homed = self.run_until(40_000, |s| s.homed && s.state == SystemState::Ready);
        assert!(homed, "homing did not complete: {:?}", self.status());
    }

    /// Put a frame on the universe and tick until the decoder has read it.
    pub fn frame(&mut self, bytes: [u8; 5]) {
        self.universe.write_channels(self.decoder_handle().base_channel(), &bytes);
        self.run(DECODER_EVERY as u32);
    }

    /// Keep feeding `bytes` for `ticks` engine ticks.
    pub fn hold_frame(&mut self, bytes: [u8; 5], ticks: u32) {
        for _ in 0..ticks.div_ceil(DECODER_EVERY as u32) {
            self.frame(bytes);
        }
    }
}
