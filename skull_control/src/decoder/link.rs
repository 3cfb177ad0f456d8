//! Link supervision: Up while valid frames keep arriving within the timeout.

use skull_common::control::status::LinkState;

#[derive(Debug, Clone, Default)]
pub struct LinkMonitor {
    state: LinkState,
    last_valid_ms: Option<u64>,
}

impl LinkMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Milliseconds since the last valid frame, if any was seen.
    pub fn silence_ms(&self, now_ms: u64) -> Option<u64> {
        self.last_valid_ms.map(|t| now_ms.saturating_sub(t))
    }

    /// Record a valid frame. Returns `true` if the link just came up.
    pub fn on_valid_frame(&mut self, now_ms: u64) -> bool {
        self.last_valid_ms = Some(now_ms);
        let was_down = self.state == LinkState::Down;
        self.state = LinkState::Up;
        was_down
    }

    /// Check the timeout. Returns `true` if the link just went down.
    pub fn poll(&mut self, now_ms: u64, timeout_ms: u32) -> bool {
        if self.state == LinkState::Down {
            return false;
        }
        let expired = self
            .silence_ms(now_ms)
            .is_none_or(|silence| silence > u64::from(timeout_ms));
        if expired {
            self.state = LinkState::Down;
        }
        expired
    }

    /// Force Down and forget the last frame time.
    pub fn reset(&mut self) -> bool {
        self.last_valid_ms = None;
        let was_up = self.state == LinkState::Up;
        self.state = LinkState::Down;
        was_up
    }
}
