// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::persist::Persister;

const DOC: &str = "return_context";

/// How long a stored return context stays consumable.
pub const RETURN_CONTEXT_TTL_MS: u64 = 30 * 60 * 1_000;

/// Where the user should be taken back to after an interruption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnContext {
    pub context_id: String,
    pub source_checkpoint: String,
    pub trigger: String,
    pub session_id: Uuid,
    pub app: String,
    pub created_at: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ReturnContextDoc {
    context: Option<ReturnContext>,
    pending_context_id: Option<String>,
}

/// Result of consuming the pending return context for an app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    NoPending,
    WrongApp,
    Expired,
    Success(ReturnContext),
}

/// Single-slot return context plus the pending pointer, with a 30-minute TTL.
pub struct ReturnContextStore {
    cache: Mutex<ReturnContextDoc>,
    persist: Arc<Persister>,
}

impl ReturnContextStore {
    pub fn restore(persist: Arc<Persister>, dir: Option<&Path>) -> Self {
        let doc = Persister::load::<ReturnContextDoc>(dir, DOC).unwrap_or_default();
        Self { cache: Mutex::new(doc), persist }
    }

    pub fn set_context(&self, context: ReturnContext) {
        let mut cache = self.cache.lock();
        debug!(context_id = %context.context_id, app = %context.app, "return context stored");
        cache.context = Some(context);
        self.flush(&cache);
    }

    pub fn set_pending(&self, context_id: &str) {
        let mut cache = self.cache.lock();
        cache.pending_context_id = Some(context_id.to_owned());
        self.flush(&cache);
    }

    pub fn clear(&self) {
        let mut cache = self.cache.lock();
        cache.context = None;
        cache.pending_context_id = None;
        self.flush(&cache);
    }

    /// Consume the pending context for `app`.
    ///
    /// On `Success` or `Expired` both the record and the pending pointer are
    /// cleared; on `WrongApp` nothing is touched so the owning app can still
    /// consume it.
    pub fn consume_pending_for(&self, app: &str, now_ms: u64) -> ConsumeOutcome {
        let mut cache = self.cache.lock();
        let Some(ref pending) = cache.pending_context_id else {
            return ConsumeOutcome::NoPending;
        };
        let Some(ref context) = cache.context else {
            return ConsumeOutcome::NoPending;
        };
        if context.context_id != *pending {
            return ConsumeOutcome::NoPending;
        }
        if context.app != app {
            debug!(app, owner = %context.app, "pending return context belongs to another app");
            return ConsumeOutcome::WrongApp;
        }
        if now_ms.saturating_sub(context.created_at) >= RETURN_CONTEXT_TTL_MS {
            info!(context_id = %context.context_id, "return context expired");
            cache.context = None;
            cache.pending_context_id = None;
            self.flush(&cache);
            return ConsumeOutcome::Expired;
        }
        let consumed = context.clone();
        cache.context = None;
        cache.pending_context_id = None;
        self.flush(&cache);
        info!(context_id = %consumed.context_id, app, "return context consumed");
        ConsumeOutcome::Success(consumed)
    }

    fn flush(&self, cache: &ReturnContextDoc) {
        if let Ok(doc) = serde_json::to_value(cache) {
            self.persist.enqueue(DOC, doc);
        }
    }
}

#[cfg(test)]
#[path = "return_context_tests.rs"]
mod tests;
