//! Where control frames come from.
//!
//! A receiver (UART break detector, network adapter, test harness) writes
//! whole universes into a [`SharedUniverse`]; the decoder pulls its five
//! channels through a [`UniverseSource`] once per tick.

use std::sync::Arc;

use parking_lot::Mutex;

use skull_common::consts::{CHANNEL_COUNT, UNIVERSE_SIZE};

/// Frame supplier for the protocol decoder.
pub trait UniverseSource: Send {
    /// The five channels starting at `base_channel` (1-based), if a universe
    /// arrived since the previous call.
    fn read_frame(&mut self, base_channel: u16) -> Option<[u8; CHANNEL_COUNT]>;
}

#[derive(Debug)]
struct UniverseBuffer {
    slots: [u8; UNIVERSE_SIZE],
    sequence: u64,
}

/// Latest received universe, shared between a receiver and the decoder.
#[derive(Debug, Clone)]
pub struct SharedUniverse {
    inner: Arc<Mutex<UniverseBuffer>>,
}

impl SharedUniverse {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(UniverseBuffer {
                slots: [0; UNIVERSE_SIZE],
                sequence: 0,
            })),
        }
    }

    /// Store a received universe. `slots[0]` is channel 1; a short universe
    /// leaves the remaining channels untouched.
    pub fn write(&self, slots: &[u8]) {
        let n = slots.len().min(UNIVERSE_SIZE);
        let mut buf = self.inner.lock();
        buf.slots[..n].copy_from_slice(&slots[..n]);
        buf.sequence += 1;
    }

    /// Overwrite channels from `first_channel` (1-based) and mark a new
    /// universe. Channels past the end are ignored.
    pub fn write_channels(&self, first_channel: u16, values: &[u8]) {
        let start = usize::from(first_channel.max(1)) - 1;
        let mut buf = self.inner.lock();
        if start < UNIVERSE_SIZE {
            let n = values.len().min(UNIVERSE_SIZE - start);
            buf.slots[start..start + n].copy_from_slice(&values[..n]);
        }
        buf.sequence += 1;
    }

    /// Universes written so far.
    pub fn sequence(&self) -> u64 {
        self.inner.lock().sequence
    }

    /// A reader that reports each universe once.
    pub fn reader(&self) -> UniverseReader {
        UniverseReader {
            universe: self.clone(),
            seen: 0,
        }
    }
}

impl Default for SharedUniverse {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct UniverseReader {
    universe: SharedUniverse,
    seen: u64,
}

impl UniverseSource for UniverseReader {
    fn read_frame(&mut self, base_channel: u16) -> Option<[u8; CHANNEL_COUNT]> {
        let start = usize::from(base_channel).checked_sub(1)?;
        let end = start + CHANNEL_COUNT;
        if end > UNIVERSE_SIZE {
            return None;
        }
        let buf = self.universe.inner.lock();
        if buf.sequence == self.seen {
            return None;
        }
        self.seen = buf.sequence;
        let mut frame = [0u8; CHANNEL_COUNT];
        frame.copy_from_slice(&buf.slots[start..end]);
        Some(frame)
    }
}
