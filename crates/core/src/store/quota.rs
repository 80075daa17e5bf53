// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::persist::Persister;

const DOC: &str = "quota";

/// Persisted quota document.
///
/// `remaining` is consumed by confirmed quick-task acceptances; the refill
/// policy for the 15-minute window lives outside the core, which is why
/// `window_start` is persisted but never evaluated here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    pub max_per_15m: u32,
    pub remaining: u32,
    pub window_start: u64,
}

/// Quota cache with asynchronous write-through.
pub struct QuotaStore {
    cache: Mutex<QuotaState>,
    persist: Arc<Persister>,
}

impl QuotaStore {
    /// Load the persisted document, or start a fresh full window.
    pub fn restore(
        persist: Arc<Persister>,
        dir: Option<&Path>,
        default_max: u32,
        now_ms: u64,
    ) -> Self {
        let state = Persister::load::<QuotaState>(dir, DOC).unwrap_or(QuotaState {
            max_per_15m: default_max,
            remaining: default_max,
            window_start: now_ms,
        });
        Self { cache: Mutex::new(state), persist }
    }

    pub fn snapshot(&self) -> QuotaState {
        *self.cache.lock()
    }

    /// Set `remaining`, clamped to `[0, max_per_15m]`.
    pub fn set_remaining(&self, remaining: u32) {
        let doc = {
            let mut state = self.cache.lock();
            state.remaining = remaining.min(state.max_per_15m);
            *state
        };
        self.flush(doc);
    }

    /// Reconfigure the maximum; resets `remaining` and restamps the window.
    pub fn set_max(&self, max_per_15m: u32, now_ms: u64) {
        let doc = {
            let mut state = self.cache.lock();
            state.max_per_15m = max_per_15m;
            state.remaining = max_per_15m;
            state.window_start = now_ms;
            *state
        };
        info!(max_per_15m, "quick task quota reconfigured");
        self.flush(doc);
    }

    fn flush(&self, doc: QuotaState) {
        if let Ok(doc) = serde_json::to_value(doc) {
            self.persist.enqueue(DOC, doc);
        }
    }
}
