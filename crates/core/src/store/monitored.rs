// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::Mutex;
use tracing::info;

use super::persist::Persister;

const DOC: &str = "monitored_apps";

/// The set of packages whose foreground entries are gated.
pub struct MonitoredAppsStore {
    cache: Mutex<IndexSet<String>>,
    persist: Arc<Persister>,
}

impl MonitoredAppsStore {
    /// Load the persisted set, falling back to `initial`.
    pub fn restore(
        persist: Arc<Persister>,
        dir: Option<&Path>,
        initial: impl IntoIterator<Item = String>,
    ) -> Self {
        let set = Persister::load::<IndexSet<String>>(dir, DOC)
            .unwrap_or_else(|| initial.into_iter().collect());
        Self { cache: Mutex::new(set), persist }
    }

    pub fn contains(&self, package: &str) -> bool {
        self.cache.lock().contains(package)
    }

    pub fn snapshot(&self) -> IndexSet<String> {
        self.cache.lock().clone()
    }

    /// Replace the whole set.
    pub fn update(&self, apps: impl IntoIterator<Item = String>) {
        let set: IndexSet<String> = apps.into_iter().collect();
        let doc = serde_json::to_value(&set).ok();
        info!(count = set.len(), "monitored apps updated");
        *self.cache.lock() = set;
        if let Some(doc) = doc {
            self.persist.enqueue(DOC, doc);
        }
    }
}
