//! Monotonic-to-wall-clock conversion for reported timestamps.

use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

/// Pairs a monotonic instant with the wall time observed at the same moment.
///
/// Decisions use `Instant`; exported metrics carry Unix milliseconds derived
/// from this anchor, so both stay consistent when tokio time is paused.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    origin: Instant,
    origin_unix_ms: u64,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            origin_unix_ms: system_unix_millis(),
        }
    }

    /// Unix epoch milliseconds corresponding to `at`.
    pub fn unix_millis(&self, at: Instant) -> u64 {
        if at >= self.origin {
            self.origin_unix_ms
                .saturating_add(duration_millis(at - self.origin))
        } else {
            self.origin_unix_ms
                .saturating_sub(duration_millis(self.origin - at))
        }
    }

    pub fn now_unix_millis(&self) -> u64 {
        self.unix_millis(Instant::now())
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

pub fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn system_unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(duration_millis)
        .unwrap_or_default()
}
