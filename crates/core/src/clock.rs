// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monotonic millisecond clock shared by the coordinator and timers.

use tokio::time::Instant;

/// Monotonic clock reporting milliseconds since the Unix epoch.
///
/// The epoch origin is captured once at construction; progress after that
/// comes from a monotonic [`Instant`], so the clock never jumps backwards
/// with wall-clock adjustments. Under `#[tokio::test(start_paused = true)]`
/// the instant base is virtual and `tokio::time::advance` drives it.
#[derive(Debug, Clone)]
pub struct Clock {
    base: Instant,
    base_ms: u64,
}

impl Clock {
    /// Clock anchored to the current wall-clock time.
    pub fn new() -> Self {
        let base_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self::with_origin(base_ms)
    }

    /// Clock anchored to an explicit epoch-ms origin (tests use origin 0 so
    /// timestamps match scenario literals).
    pub fn with_origin(base_ms: u64) -> Self {
        Self { base: Instant::now(), base_ms }
    }

    /// Current time in milliseconds since the Unix epoch.
    pub fn now_ms(&self) -> u64 {
        self.base_ms + self.base.elapsed().as_millis() as u64
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
