//! Limit switch edge capture and debouncing.
//!
//! Split in two halves:
//! - [`LimitCapture`] is written from interrupt context. Each rising edge is
//!   one atomic increment; no locks, no allocation, no filtering.
//! - [`LimitDebouncer`] runs inside the engine tick. It notices new edges by
//!   comparing counters, then confirms an edge only if the input is still
//!   active and the previous accepted edge on that side is older than the
//!   debounce window.

use std::sync::atomic::{AtomicU32, Ordering};

/// Which end of travel a switch guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LimitSide {
    Min = 0,
    Max = 1,
}

impl LimitSide {
    pub const ALL: [Self; 2] = [Self::Min, Self::Max];
}

// ─── Interrupt Side ─────────────────────────────────────────────────

/// Latched edge counters shared with the edge interrupt.
#[derive(Debug, Default)]
pub struct LimitCapture {
    edges: [AtomicU32; 2],
}

impl LimitCapture {
    pub const fn new() -> Self {
        Self {
            edges: [AtomicU32::new(0), AtomicU32::new(0)],
        }
    }

    /// Record a rising edge. Safe to call from interrupt context.
    #[inline]
    pub fn on_edge(&self, side: LimitSide) {
        self.edges[side as usize].fetch_add(1, Ordering::Release);
    }

    /// Total edges seen on `side` since start (wrapping).
    #[inline]
    pub fn edge_count(&self, side: LimitSide) -> u32 {
        self.edges[side as usize].load(Ordering::Acquire)
    }
}

// ─── Tick Side ──────────────────────────────────────────────────────

/// Current switch input levels (`true` = switch pressed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LimitLevels {
    pub min: bool,
    pub max: bool,
}

impl LimitLevels {
    #[inline]
    pub const fn get(&self, side: LimitSide) -> bool {
        match side {
            LimitSide::Min => self.min,
            LimitSide::Max => self.max,
        }
    }
}

/// Edges confirmed during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfirmedEdges {
    pub min: bool,
    pub max: bool,
}

impl ConfirmedEdges {
    pub const NONE: Self = Self {
        min: false,
        max: false,
    };

    #[inline]
    pub const fn any(&self) -> bool {
        self.min || self.max
    }

    #[inline]
    pub const fn get(&self, side: LimitSide) -> bool {
        match side {
            LimitSide::Min => self.min,
            LimitSide::Max => self.max,
        }
    }

    /// First confirmed side, min before max.
    pub const fn first(&self) -> Option<LimitSide> {
        if self.min {
            Some(LimitSide::Min)
        } else if self.max {
            Some(LimitSide::Max)
        } else {
            None
        }
    }

    fn set(&mut self, side: LimitSide) {
        match side {
            LimitSide::Min => self.min = true,
            LimitSide::Max => self.max = true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SideState {
    seen: u32,
    pending: bool,
    last_accepted_ms: Option<u64>,
}

/// Per-tick edge confirmation.
#[derive(Debug, Clone, Default)]
pub struct LimitDebouncer {
    sides: [SideState; 2],
}

impl LimitDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume new edges from `capture` and return the confirmed ones.
    pub fn poll(
        &mut self,
        capture: &LimitCapture,
        levels: LimitLevels,
        now_ms: u64,
        debounce_ms: u32,
    ) -> ConfirmedEdges {
        let mut confirmed = ConfirmedEdges::NONE;
        for side in LimitSide::ALL {
            let state = &mut self.sides[side as usize];
            let count = capture.edge_count(side);
            if count != state.seen {
                state.seen = count;
                state.pending = true;
            }
            if !state.pending {
                continue;
            }
            if !levels.get(side) {
                // Released before confirmation: contact bounce or noise.
                state.pending = false;
                continue;
            }
            let in_window = state
                .last_accepted_ms
                .is_some_and(|t| now_ms.saturating_sub(t) < u64::from(debounce_ms));
            if !in_window {
                state.pending = false;
                state.last_accepted_ms = Some(now_ms);
                confirmed.set(side);
            }
        }
        confirmed
    }
}
