//! Shared status record.
//!
//! Readers always receive a copy; no reference to the record ever leaves
//! this module. Writers from the periodic ticks use a bounded wait and skip
//! the update when the lock is busy.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use skull_common::control::motion::PositionLimits;
use skull_common::control::status::SystemStatus;

#[derive(Debug)]
pub struct StatusBoard {
    record: Mutex<SystemStatus>,
    lock_timeout: Duration,
    skipped: AtomicU64,
}

impl StatusBoard {
    pub fn new(limits: PositionLimits, lock_timeout: Duration) -> Self {
        Self {
            record: Mutex::new(SystemStatus::new(limits)),
            lock_timeout,
            skipped: AtomicU64::new(0),
        }
    }

    /// Applies `update` to the record. Returns `false` (and counts a skip)
    /// when the lock could not be taken within the bounded wait.
    pub fn publish(&self, update: impl FnOnce(&mut SystemStatus)) -> bool {
        match self.record.try_lock_for(self.lock_timeout) {
            Some(mut record) => {
                update(&mut record);
                true
            }
            None => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Copy of the record for non-periodic readers.
    pub fn snapshot(&self) -> SystemStatus {
        *self.record.lock()
    }

    /// Copy of the record, or `None` if the lock stayed busy.
    pub fn try_snapshot(&self) -> Option<SystemStatus> {
        self.record.try_lock_for(self.lock_timeout).map(|r| *r)
    }

    /// Updates skipped because of lock contention.
    pub fn skipped_updates(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}
