//! Protocol decoder: control frames in, motion commands out.
//!
//! Each tick reads the newest frame at the base channel, discards known
//! noise patterns, caches the frame, tracks link health and the mode byte,
//! and may enqueue one command. The decoder never touches the axis; every
//! request goes through the same [`CommandBus`] as any other producer.
//!
//! Runtime settings (base channel, timeout, enable, 16-bit mode) live in a
//! [`DecoderControl`] shared with any number of [`DecoderHandle`]s, so a
//! front-end can change them between ticks without locking the decoder.

pub mod link;
pub mod mode;
pub mod synth;
pub mod universe;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU16, AtomicU32, AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use skull_common::consts::{
    CHANNEL_COUNT, LINK_TIMEOUT_MS_MAX, LINK_TIMEOUT_MS_MIN, MAX_BASE_CHANNEL,
};
use skull_common::control::command::{CommandKind, MotionCommand};
use skull_common::control::config::{CoreConfig, DecoderConfig};
use skull_common::control::frame::{ControlFrame, ControlMode};
use skull_common::control::status::{LinkState, SystemState, SystemStatus};

use crate::bus::{CommandBus, StatusBoard};
use crate::config::ConfigHandle;
use crate::cycle::PeriodicTask;

use link::LinkMonitor;
use mode::{ModeBands, ModeDecoder};
use synth::CommandSynth;
use universe::UniverseSource;

// ─── Shared Control Block ───────────────────────────────────────────

/// Packet and command counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecoderStats {
    /// Frames read from the source.
    pub frames_total: u64,
    /// Frames discarded as noise.
    pub frames_corrupt: u64,
    pub commands_emitted: u64,
    /// Commands refused by a full queue.
    pub commands_dropped: u64,
}

#[derive(Debug)]
pub struct DecoderControl {
    base_channel: AtomicU16,
    timeout_ms: AtomicU32,
    enabled: AtomicBool,
    use_16bit: AtomicBool,
    mode: AtomicU8,
    link: AtomicU8,
    frame: Mutex<ControlFrame>,
    frames_total: AtomicU64,
    frames_corrupt: AtomicU64,
    commands_emitted: AtomicU64,
    commands_dropped: AtomicU64,
}

impl DecoderControl {
    fn new(config: &DecoderConfig) -> Self {
        let ctl = Self {
            base_channel: AtomicU16::new(1),
            timeout_ms: AtomicU32::new(0),
            enabled: AtomicBool::new(false),
            use_16bit: AtomicBool::new(false),
            mode: AtomicU8::new(ControlMode::Stop as u8),
            link: AtomicU8::new(LinkState::Down as u8),
            frame: Mutex::new(ControlFrame::default()),
            frames_total: AtomicU64::new(0),
            frames_corrupt: AtomicU64::new(0),
            commands_emitted: AtomicU64::new(0),
            commands_dropped: AtomicU64::new(0),
        };
        ctl.apply_config(config);
        ctl
    }

    fn apply_config(&self, config: &DecoderConfig) {
        self.base_channel
            .store(config.base_channel.clamp(1, MAX_BASE_CHANNEL), Ordering::Relaxed);
        self.timeout_ms.store(config.timeout_ms, Ordering::Relaxed);
        self.enabled.store(config.enabled, Ordering::Relaxed);
        self.use_16bit.store(config.position_16bit, Ordering::Relaxed);
    }

    fn count(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Cloneable front-end access to a running decoder.
#[derive(Debug, Clone)]
pub struct DecoderHandle {
    ctl: Arc<DecoderControl>,
}

impl DecoderHandle {
    /// Move the 5-channel window. Accepts 1..=508.
    pub fn set_base_channel(&self, channel: u16) -> bool {
        if !(1..=MAX_BASE_CHANNEL).contains(&channel) {
            warn!(channel, "base channel out of range");
            return false;
        }
        self.ctl.base_channel.store(channel, Ordering::Relaxed);
        info!(channel, "decoder base channel set");
        true
    }

    /// Link timeout in milliseconds. Accepts 100..=60000.
    pub fn set_timeout(&self, timeout_ms: u32) -> bool {
        if !(LINK_TIMEOUT_MS_MIN..=LINK_TIMEOUT_MS_MAX).contains(&timeout_ms) {
            warn!(timeout_ms, "link timeout out of range");
            return false;
        }
        self.ctl.timeout_ms.store(timeout_ms, Ordering::Relaxed);
        info!(timeout_ms, "decoder link timeout set");
        true
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.ctl.enabled.store(enabled, Ordering::Relaxed);
        info!(enabled, "decoder enable");
    }

    pub fn set_16bit_position_mode(&self, enabled: bool) {
        self.ctl.use_16bit.store(enabled, Ordering::Relaxed);
        info!(enabled, "decoder 16-bit position");
    }

    /// Last valid frame in wire order.
    pub fn channel_snapshot(&self) -> [u8; CHANNEL_COUNT] {
        self.ctl.frame.lock().bytes()
    }

    pub fn current_mode(&self) -> ControlMode {
        ControlMode::from_u8(self.ctl.mode.load(Ordering::Relaxed))
    }

    pub fn link_state(&self) -> LinkState {
        LinkState::from_u8(self.ctl.link.load(Ordering::Relaxed))
    }

    pub fn base_channel(&self) -> u16 {
        self.ctl.base_channel.load(Ordering::Relaxed)
    }

    pub fn timeout_ms(&self) -> u32 {
        self.ctl.timeout_ms.load(Ordering::Relaxed)
    }

    pub fn is_enabled(&self) -> bool {
        self.ctl.enabled.load(Ordering::Relaxed)
    }

    pub fn is_16bit_position_mode(&self) -> bool {
        self.ctl.use_16bit.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> DecoderStats {
        DecoderStats {
            frames_total: self.ctl.frames_total.load(Ordering::Relaxed),
            frames_corrupt: self.ctl.frames_corrupt.load(Ordering::Relaxed),
            commands_emitted: self.ctl.commands_emitted.load(Ordering::Relaxed),
            commands_dropped: self.ctl.commands_dropped.load(Ordering::Relaxed),
        }
    }

    pub fn reset_stats(&self) {
        self.ctl.frames_total.store(0, Ordering::Relaxed);
        self.ctl.frames_corrupt.store(0, Ordering::Relaxed);
        self.ctl.commands_emitted.store(0, Ordering::Relaxed);
        self.ctl.commands_dropped.store(0, Ordering::Relaxed);
    }
}

// ─── Protocol Decoder ───────────────────────────────────────────────

pub struct ProtocolDecoder {
    ctl: Arc<DecoderControl>,
    source: Box<dyn UniverseSource>,
    bus: Arc<CommandBus>,
    status: Arc<StatusBoard>,
    config: ConfigHandle,
    config_generation: u64,

    link: LinkMonitor,
    published_link: Option<LinkState>,
    mode: ModeDecoder,
    synth: CommandSynth,
    /// Id of the `Home` sent on entering Home mode, until homing finishes.
    awaiting_home: Option<u32>,
}

impl ProtocolDecoder {
    pub fn new(
        config: ConfigHandle,
        bus: Arc<CommandBus>,
        status: Arc<StatusBoard>,
        source: Box<dyn UniverseSource>,
    ) -> Self {
        let cfg = config.snapshot();
        Self {
            ctl: Arc::new(DecoderControl::new(&cfg.decoder)),
            source,
            bus,
            status,
            config_generation: config.generation(),
            config,
            link: LinkMonitor::new(),
            published_link: None,
            mode: ModeDecoder::new(),
            synth: CommandSynth::new(),
            awaiting_home: None,
        }
    }

    pub fn handle(&self) -> DecoderHandle {
        DecoderHandle {
            ctl: Arc::clone(&self.ctl),
        }
    }

    #[inline]
    pub fn link_state(&self) -> LinkState {
        self.link.state()
    }

    #[inline]
    pub fn current_mode(&self) -> ControlMode {
        self.mode.mode()
    }

    /// Run one decoder cycle at `now_ms` on the monotonic clock.
    ///
    /// Link timeout and idle resend are measured on this clock, not on the
    /// number of ticks run.
    pub fn tick_at(&mut self, now_ms: u64) {
        let cfg = self.config.snapshot();
        self.follow_config(&cfg);

        if !self.ctl.enabled.load(Ordering::Relaxed) {
            if self.link.reset() {
                info!("decoder disabled, link down");
            }
            self.publish_link();
            return;
        }

        let fresh = self.read_frame(now_ms);
        let timeout_ms = self.ctl.timeout_ms.load(Ordering::Relaxed);
        if self.link.poll(now_ms, timeout_ms) {
            warn!(timeout_ms, "control link lost");
        }
        self.publish_link();
        if self.link.state() == LinkState::Down {
            // Frozen: no control action until valid frames return.
            return;
        }

        let status = self.status.try_snapshot();
        if let Some(status) = &status {
            self.release_home(status);
        }

        if let Some(frame) = fresh {
            let bands = ModeBands::from_config(&cfg.decoder);
            if let Some(mode) = self.mode.feed(frame.mode_byte(), &bands) {
                self.ctl.mode.store(mode as u8, Ordering::Relaxed);
                self.enter_mode(mode, &frame);
            }
        }

        let Some(status) = status else {
            trace!("status busy, synthesis skipped");
            return;
        };
        if self.awaiting_home.is_some()
            || self.mode.mode() != ControlMode::Control
            || !status.accepts_positioning()
        {
            return;
        }
        self.synthesize(&status, &cfg, now_ms);
    }

    fn follow_config(&mut self, cfg: &CoreConfig) {
        let generation = self.config.generation();
        if generation == self.config_generation {
            return;
        }
        self.config_generation = generation;
        self.ctl.apply_config(&cfg.decoder);
        info!(
            generation,
            base_channel = cfg.decoder.base_channel,
            timeout_ms = cfg.decoder.timeout_ms,
            "decoder settings reloaded"
        );
    }

    fn read_frame(&mut self, now_ms: u64) -> Option<ControlFrame> {
        let base = self.ctl.base_channel.load(Ordering::Relaxed);
        let frame = ControlFrame::from(self.source.read_frame(base)?);
        DecoderControl::count(&self.ctl.frames_total);
        if frame.is_corrupt() {
            DecoderControl::count(&self.ctl.frames_corrupt);
            debug!(bytes = ?frame.bytes(), "corrupt frame discarded");
            return None;
        }
        *self.ctl.frame.lock() = frame;
        if self.link.on_valid_frame(now_ms) {
            info!(base_channel = base, "control link up");
        }
        Some(frame)
    }

    fn publish_link(&mut self) {
        let state = self.link.state();
        self.ctl.link.store(state as u8, Ordering::Relaxed);
        if self.published_link == Some(state) {
            return;
        }
        if self.status.publish(|s| s.link = state) {
            self.published_link = Some(state);
        } else {
            debug!(?state, "status busy, link update deferred");
        }
    }

    fn release_home(&mut self, status: &SystemStatus) {
        let Some(id) = self.awaiting_home else {
            return;
        };
        if status.state != SystemState::Homing && status.last_command_id >= id {
            self.awaiting_home = None;
            debug!(id, homed = status.homed, "homing finished, decoder resumes");
        }
    }

    fn enter_mode(&mut self, mode: ControlMode, frame: &ControlFrame) {
        info!(?mode, mode_byte = frame.mode_byte(), "decoder mode");
        self.synth.reset();
        if self.awaiting_home.is_some() {
            debug!(?mode, "homing in progress, mode command suppressed");
            return;
        }
        match mode {
            ControlMode::Home => {
                let cmd = self.bus.command(CommandKind::Home);
                if self.emit_command(cmd) {
                    self.awaiting_home = Some(cmd.id());
                }
            }
            ControlMode::Stop => {
                self.emit_command(self.bus.command(CommandKind::Stop));
            }
            ControlMode::Control => {}
        }
    }

    fn synthesize(&mut self, status: &SystemStatus, cfg: &CoreConfig, now_ms: u64) {
        let frame = *self.ctl.frame.lock();
        let use_16bit = self.ctl.use_16bit.load(Ordering::Relaxed);
        let Some(mv) = self.synth.propose(&frame, use_16bit, status, cfg, now_ms) else {
            return;
        };
        let cmd = self
            .bus
            .command_with(CommandKind::MoveAbsolute { target: mv.target }, mv.profile());
        if self.emit_command(cmd) {
            self.synth.commit(&mv, now_ms);
            trace!(target = mv.target, speed = mv.speed, "decoder move");
        }
    }

    fn emit_command(&self, cmd: MotionCommand) -> bool {
        if self.bus.submit(cmd) {
            DecoderControl::count(&self.ctl.commands_emitted);
            true
        } else {
            DecoderControl::count(&self.ctl.commands_dropped);
            debug!(id = cmd.id(), kind = cmd.kind().label(), "decoder command dropped");
            false
        }
    }
}

impl PeriodicTask for ProtocolDecoder {
    fn name(&self) -> &'static str {
        "decoder"
    }

    fn tick(&mut self) {
        let now_ms = self.bus.now_ms();
        self.tick_at(now_ms);
    }
}
