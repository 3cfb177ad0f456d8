//! Wiring: one bus, one status board, one engine, one decoder.
//!
//! [`assemble`] builds the components without starting anything, which is
//! what tests and benches use to tick them by hand. [`Core::start`] puts
//! each component on its own fixed-period worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{error, info};

use crate::bus::{CommandBus, StatusBoard};
use crate::config::ConfigHandle;
use crate::cycle::{CycleError, CycleStats, spawn_periodic};
use crate::decoder::universe::UniverseSource;
use crate::decoder::{DecoderHandle, ProtocolDecoder};
use crate::drive::AxisDriver;
use crate::engine::limits::LimitCapture;
use crate::engine::{EngineHandle, MotionEngine};

/// Components sharing one bus and one status board, not yet running.
pub struct Components {
    pub engine: MotionEngine,
    pub decoder: ProtocolDecoder,
    pub bus: Arc<CommandBus>,
    pub status: Arc<StatusBoard>,
}

/// Build engine and decoder around a fresh bus and status board.
///
/// `capture` must be the same counters the drive's limit inputs write to.
pub fn assemble(
    config: ConfigHandle,
    drive: Box<dyn AxisDriver>,
    capture: Arc<LimitCapture>,
    source: Box<dyn UniverseSource>,
) -> Components {
    let cfg = config.snapshot();
    let bus = Arc::new(CommandBus::new(cfg.engine.queue_capacity));
    let status = Arc::new(StatusBoard::new(
        cfg.position_limits(),
        Duration::from_micros(u64::from(cfg.engine.status_lock_timeout_us)),
    ));
    let engine = MotionEngine::new(
        config.clone(),
        Arc::clone(&bus),
        Arc::clone(&status),
        capture,
        drive,
    );
    let decoder = ProtocolDecoder::new(config, Arc::clone(&bus), Arc::clone(&status), source);
    Components {
        engine,
        decoder,
        bus,
        status,
    }
}

/// Running engine and decoder workers.
pub struct Core {
    config: ConfigHandle,
    engine: EngineHandle,
    decoder: DecoderHandle,
    running: Arc<AtomicBool>,
    workers: Vec<(&'static str, JoinHandle<CycleStats>)>,
}

impl Core {
    /// Spawn both workers. They run until `running` is cleared or
    /// [`shutdown`](Self::shutdown) is called.
    pub fn start(
        config: ConfigHandle,
        drive: Box<dyn AxisDriver>,
        capture: Arc<LimitCapture>,
        source: Box<dyn UniverseSource>,
        running: Arc<AtomicBool>,
    ) -> Result<Self, CycleError> {
        let cfg = config.snapshot();
        let parts = assemble(config.clone(), drive, capture, source);
        let engine = parts.engine.handle();
        let decoder = parts.decoder.handle();

        let mut workers = Vec::with_capacity(2);
        let engine_period = Duration::from_micros(u64::from(cfg.engine.cycle_time_us));
        workers.push((
            "engine",
            spawn_periodic(parts.engine, engine_period, Arc::clone(&running))?,
        ));
        let decoder_period = Duration::from_micros(u64::from(cfg.decoder.cycle_time_us));
        match spawn_periodic(parts.decoder, decoder_period, Arc::clone(&running)) {
            Ok(handle) => workers.push(("decoder", handle)),
            Err(e) => {
                running.store(false, Ordering::Release);
                for (_, worker) in workers {
                    let _ = worker.join();
                }
                return Err(e);
            }
        }
        info!(
            engine_us = cfg.engine.cycle_time_us,
            decoder_us = cfg.decoder.cycle_time_us,
            "core started"
        );

        Ok(Self {
            config,
            engine,
            decoder,
            running,
            workers,
        })
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn decoder(&self) -> &DecoderHandle {
        &self.decoder
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop the workers and collect their timing statistics.
    pub fn shutdown(self) -> Result<Vec<(&'static str, CycleStats)>, CycleError> {
        self.running.store(false, Ordering::Release);
        let mut stats = Vec::with_capacity(self.workers.len());
        let mut panicked = None;
        for (name, worker) in self.workers {
            match worker.join() {
                Ok(s) => stats.push((name, s)),
                Err(_) => {
                    error!(task = name, "worker panicked");
                    panicked.get_or_insert(name);
                }
            }
        }
        match panicked {
            Some(name) => Err(CycleError::WorkerPanicked(name.to_string())),
            None => Ok(stats),
        }
    }
}
