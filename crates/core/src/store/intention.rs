// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::persist::Persister;

const DOC: &str = "intentions";

/// Per-app "I'll use this for N minutes" expiry timestamps.
///
/// Reads are TTL-aware: an entry whose `until_ms` has passed is reported
/// absent and removed from the cache on the spot.
pub struct IntentionStore {
    cache: Mutex<HashMap<String, u64>>,
    persist: Arc<Persister>,
}

impl IntentionStore {
    pub fn restore(persist: Arc<Persister>, dir: Option<&Path>) -> Self {
        let map = Persister::load::<HashMap<String, u64>>(dir, DOC).unwrap_or_default();
        Self { cache: Mutex::new(map), persist }
    }

    /// TTL-aware read: expired entries are absent (and pruned).
    pub fn get(&self, app: &str, now_ms: u64) -> Option<u64> {
        let mut cache = self.cache.lock();
        match cache.get(app).copied() {
            Some(until_ms) if until_ms > now_ms => Some(until_ms),
            Some(_) => {
                debug!(app, "expired intention pruned on read");
                cache.remove(app);
                self.flush(&cache);
                None
            }
            None => None,
        }
    }

    /// Raw read without TTL handling; the expiry path uses this to compare
    /// the stored deadline against the one its timer was armed with.
    pub fn peek(&self, app: &str) -> Option<u64> {
        self.cache.lock().get(app).copied()
    }

    /// Milliseconds left on the intention, 0 when none.
    pub fn remaining_ms(&self, app: &str, now_ms: u64) -> u64 {
        self.get(app, now_ms).map_or(0, |until| until - now_ms)
    }

    pub fn set(&self, app: &str, until_ms: u64) {
        let mut cache = self.cache.lock();
        cache.insert(app.to_owned(), until_ms);
        self.flush(&cache);
    }

    /// Remove and return the stored deadline, if any.
    pub fn remove(&self, app: &str) -> Option<u64> {
        let mut cache = self.cache.lock();
        let prior = cache.remove(app);
        if prior.is_some() {
            self.flush(&cache);
        }
        prior
    }

    fn flush(&self, cache: &HashMap<String, u64>) {
        if let Ok(doc) = serde_json::to_value(cache) {
            self.persist.enqueue(DOC, doc);
        }
    }
}

#[cfg(test)]
#[path = "intention_tests.rs"]
mod tests;
