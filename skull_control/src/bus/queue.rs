//! Bounded FIFO of motion commands.
//!
//! Storage is a pre-allocated `heapless::Deque`; pushing never allocates.
//! The lock is held only to copy one command in or out, and both sides use
//! a bounded wait so neither a producer nor the engine tick can stall.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use heapless::Deque;
use parking_lot::Mutex;
use tracing::warn;

use skull_common::consts::QUEUE_CAPACITY_MAX;
use skull_common::control::command::MotionCommand;

/// Longest time either side waits for the queue lock.
const LOCK_WAIT: Duration = Duration::from_micros(50);

#[derive(Debug)]
pub struct CommandQueue {
    slots: Mutex<Deque<MotionCommand, QUEUE_CAPACITY_MAX>>,
    capacity: usize,
    accepted: AtomicU64,
    dropped: AtomicU64,
    /// Drops because the lock stayed busy past `LOCK_WAIT`.
    contended: AtomicU64,
}

impl CommandQueue {
    /// `capacity` is clamped to `1..=QUEUE_CAPACITY_MAX`.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(Deque::new()),
            capacity: capacity.clamp(1, QUEUE_CAPACITY_MAX),
            accepted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            contended: AtomicU64::new(0),
        }
    }

    /// Appends `cmd`, or drops it when the queue is full or contended.
    pub fn push(&self, cmd: MotionCommand) -> bool {
        let Some(mut slots) = self.slots.try_lock_for(LOCK_WAIT) else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            self.contended.fetch_add(1, Ordering::Relaxed);
            warn!(id = cmd.id(), kind = cmd.kind().label(), "command queue busy, command dropped");
            return false;
        };
        if slots.len() < self.capacity && slots.push_back(cmd).is_ok() {
            self.accepted.fetch_add(1, Ordering::Relaxed);
            return true;
        }
        drop(slots);
        self.dropped.fetch_add(1, Ordering::Relaxed);
        warn!(id = cmd.id(), kind = cmd.kind().label(), "command queue full, command dropped");
        false
    }

    /// Removes the oldest command, if any.
    pub fn pop(&self) -> Option<MotionCommand> {
        self.slots.try_lock_for(LOCK_WAIT)?.pop_front()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Commands accepted since start.
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Commands dropped since start, for any reason.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Of [`dropped`](Self::dropped), those lost to lock contention rather
    /// than a full queue.
    pub fn contended(&self) -> u64 {
        self.contended.load(Ordering::Relaxed)
    }
}
