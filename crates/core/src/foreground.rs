// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Foreground stream tracking.
//!
//! Consumes raw `(package, timestamp)` events, classifies them, collapses
//! duplicates, and answers the effective-foreground question that
//! foreground-gated expiry depends on.

use std::collections::HashSet;

use parking_lot::Mutex;
use tracing::debug;

/// Events for the same package closer together than this are collapsed.
pub const DUPLICATE_COLLAPSE_MS: u64 = 400;

/// Repeat monitored-entry notifications within this window are debounced.
pub const ENTRY_DEBOUNCE_MS: u64 = 300;

/// How stale `last_real_foreground` may be and still count as effective.
pub const EFFECTIVE_FOREGROUND_MAX_AGE_MS: u64 = 30_000;

/// What kind of package a foreground event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FgClass {
    /// System shade, launcher: never eligible for intervention.
    SystemUi,
    /// The application hosting this core: ignored entirely, so our own
    /// surfaces coming to the foreground do not disturb tracking.
    SelfApp,
    RealApp,
}

#[derive(Default)]
struct FgInner {
    /// Most recent non-self foreground package with its timestamp.
    current: Option<(String, u64)>,
    /// Most recent real (non-system, non-self) app with its timestamp.
    last_real: Option<(String, u64)>,
    /// Previous raw event, for duplicate collapse.
    last_event: Option<(String, u64)>,
    /// Per-app time of the last entry notification, for the entry debounce.
    last_entry: std::collections::HashMap<String, u64>,
}

/// Tracks the foreground stream and classifies packages.
pub struct ForegroundTracker {
    self_package: String,
    system_packages: HashSet<String>,
    inner: Mutex<FgInner>,
}

impl ForegroundTracker {
    pub fn new(
        self_package: impl Into<String>,
        system_packages: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            self_package: self_package.into(),
            system_packages: system_packages.into_iter().collect(),
            inner: Mutex::new(FgInner::default()),
        }
    }

    pub fn classify(&self, package: &str) -> FgClass {
        if package == self.self_package {
            FgClass::SelfApp
        } else if self.system_packages.contains(package) {
            FgClass::SystemUi
        } else {
            FgClass::RealApp
        }
    }

    /// Process one raw foreground event.
    ///
    /// Returns the package when it is a real app whose entry should be
    /// offered to the coordinator for gating, after duplicate collapse and
    /// the entry debounce.
    pub fn observe(&self, package: &str, at_ms: u64) -> Option<String> {
        let mut inner = self.inner.lock();

        if let Some((ref last_pkg, last_at)) = inner.last_event {
            if last_pkg == package && at_ms.saturating_sub(last_at) < DUPLICATE_COLLAPSE_MS {
                debug!(package, at_ms, "duplicate foreground event collapsed");
                return None;
            }
        }
        inner.last_event = Some((package.to_owned(), at_ms));

        match self.classify(package) {
            FgClass::SelfApp => None,
            FgClass::SystemUi => {
                inner.current = Some((package.to_owned(), at_ms));
                None
            }
            FgClass::RealApp => {
                inner.current = Some((package.to_owned(), at_ms));
                inner.last_real = Some((package.to_owned(), at_ms));

                if let Some(&last_at) = inner.last_entry.get(package) {
                    if at_ms.saturating_sub(last_at) < ENTRY_DEBOUNCE_MS {
                        debug!(package, at_ms, "repeat entry debounced");
                        return None;
                    }
                }
                inner.last_entry.insert(package.to_owned(), at_ms);
                Some(package.to_owned())
            }
        }
    }

    /// Most recent non-self foreground package, with its timestamp.
    pub fn current_foreground(&self) -> Option<(String, u64)> {
        self.inner.lock().current.clone()
    }

    /// Forget the current foreground (screen off, stream interruption).
    /// `last_real_foreground` is kept so effective-foreground reads can
    /// still fall back to it while it is fresh.
    pub fn clear_current(&self) {
        self.inner.lock().current = None;
    }

    /// Most recent real app, with its timestamp.
    pub fn last_real_foreground(&self) -> Option<(String, u64)> {
        self.inner.lock().last_real.clone()
    }

    /// The foreground a timer expiry should reason about: the current
    /// foreground when one is known, else the last real app if it was seen
    /// within [`EFFECTIVE_FOREGROUND_MAX_AGE_MS`], else none.
    pub fn effective_foreground(&self, now_ms: u64) -> Option<String> {
        let inner = self.inner.lock();
        if let Some((ref pkg, _)) = inner.current {
            return Some(pkg.clone());
        }
        match inner.last_real {
            Some((ref pkg, at)) if now_ms.saturating_sub(at) < EFFECTIVE_FOREGROUND_MAX_AGE_MS => {
                Some(pkg.clone())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "foreground_tests.rs"]
mod tests;
