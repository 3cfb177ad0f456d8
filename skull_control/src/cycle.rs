//! Fixed-period workers.
//!
//! Each periodic component (motion engine, protocol decoder) implements
//! [`PeriodicTask`] and runs on its own named thread. Pacing sleeps until an
//! absolute deadline so that tick jitter does not accumulate; after an
//! overrun the deadline is re-anchored to "now" instead of bursting to catch
//! up.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

/// A component driven by a fixed-period loop.
pub trait PeriodicTask: Send {
    fn name(&self) -> &'static str;

    /// One cycle. Must not block.
    fn tick(&mut self);

    /// Called once on the worker thread after the last tick.
    fn shutdown(&mut self) {}
}

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: u64,
    pub min_cycle_ns: u64,
    pub max_cycle_ns: u64,
    pub sum_cycle_ns: u64,
    /// Cycles whose body ran past the period.
    pub overruns: u64,
    /// Largest wake-up delay past the deadline [ns].
    pub max_latency_ns: u64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: u64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: u64, latency_ns: u64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns = self.sum_cycle_ns.saturating_add(duration_ns);
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average cycle time [ns] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> u64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("failed to spawn worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("worker '{0}' panicked")]
    WorkerPanicked(String),
}

// ─── Worker Loop ────────────────────────────────────────────────────

/// Run `task` every `period` on a new thread until `running` goes false.
///
/// The join handle yields the worker's timing statistics.
pub fn spawn_periodic<T>(
    mut task: T,
    period: Duration,
    running: Arc<AtomicBool>,
) -> Result<JoinHandle<CycleStats>, CycleError>
where
    T: PeriodicTask + 'static,
{
    let name = task.name();
    let handle = std::thread::Builder::new()
        .name(format!("skull-{name}"))
        .spawn(move || {
            info!(task = name, period_us = period.as_micros() as u64, "worker started");
            let stats = run_loop(&mut task, period, &running);
            task.shutdown();
            info!(
                task = name,
                cycles = stats.cycle_count,
                overruns = stats.overruns,
                "worker stopped"
            );
            stats
        })?;
    Ok(handle)
}

fn run_loop<T: PeriodicTask>(task: &mut T, period: Duration, running: &AtomicBool) -> CycleStats {
    let mut stats = CycleStats::new();
    let period_ns = period.as_nanos() as u64;
    let mut deadline = Instant::now();

    while running.load(Ordering::Acquire) {
        let start = Instant::now();
        let latency_ns = start.saturating_duration_since(deadline).as_nanos() as u64;

        task.tick();

        let elapsed_ns = start.elapsed().as_nanos() as u64;
        stats.record(elapsed_ns, latency_ns);

        deadline += period;
        let now = Instant::now();
        if elapsed_ns > period_ns || now > deadline {
            stats.overruns += 1;
            if stats.overruns == 1 || stats.overruns % 1000 == 0 {
                warn!(
                    task = task.name(),
                    elapsed_ns,
                    period_ns,
                    overruns = stats.overruns,
                    "cycle overrun"
                );
            }
            deadline = now;
            continue;
        }
        std::thread::sleep(deadline - now);
    }
    debug!(task = task.name(), avg_ns = stats.avg_cycle_ns(), "loop exited");
    stats
}
