// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Intentions: user-set timeboxes whose expiry, with the user still on the
//! app, forces an intervention.
//!
//! The lifecycle mirrors the quick task but is simpler: one timer per app,
//! idempotent expiry validated against the stored deadline, and a guarded
//! forced-intervention trigger.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use crate::event::WakeReason;
use crate::state::QtState;

use super::{Coordinator, FORCED_INTERVENTION_DEBOUNCE_MS};

impl Coordinator {
    /// Store an intention and arm its expiry timer. A deadline already in
    /// the past clears any existing intention instead.
    pub fn set_intention_until(self: &Arc<Self>, app: &str, until_ms: u64) {
        let now = self.now_ms();
        if until_ms <= now {
            self.clear_intention(app, "deadline already passed");
            return;
        }

        let prior = {
            let mut tables = self.tables.lock();
            tables.app(app).intention_timer.take()
        };
        if let Some(handle) = prior {
            self.timers.cancel(handle);
        }

        self.intentions.set(app, until_ms);
        info!(app, until_ms, "intention set");

        let coordinator = Arc::clone(self);
        let timer_app = app.to_owned();
        let handle = self
            .timers
            .schedule(Duration::from_millis(until_ms - now), move || {
                coordinator.on_intention_expired(&timer_app, until_ms);
            });
        let mut tables = self.tables.lock();
        tables.app(app).intention_timer = Some(handle);
    }

    /// Drop an intention and its timer.
    pub fn clear_intention(&self, app: &str, reason: &str) {
        let prior = {
            let mut tables = self.tables.lock();
            tables.app(app).intention_timer.take()
        };
        if let Some(handle) = prior {
            self.timers.cancel(handle);
        }
        if self.intentions.remove(app).is_some() {
            info!(app, reason, "intention cleared");
        }
    }

    /// Expiry fire. Validated against the stored deadline so a superseded
    /// or cleared intention's late fire is a no-op.
    pub(crate) fn on_intention_expired(self: &Arc<Self>, app: &str, expected_until_ms: u64) {
        let now = self.now_ms();
        if self.intentions.peek(app) != Some(expected_until_ms) || now < expected_until_ms {
            debug!(app, expected_until_ms, "stale intention expiry ignored");
            return;
        }

        {
            let mut tables = self.tables.lock();
            tables.app(app).intention_timer = None;
        }
        self.intentions.remove(app);

        let on_app = self.foreground.effective_foreground(now).as_deref() == Some(app);
        if on_app {
            info!(app, "intention expired on app, forcing intervention");
            self.force_intervention(app);
        } else {
            info!(app, "intention expired while away");
        }
    }

    /// Surface an intervention outside the normal entry flow.
    ///
    /// Guardrails: debounced against a live surface, an in-flight decision,
    /// wake suppression, and a recent forced intervention; the foreground
    /// is re-checked immediately before the emit.
    pub(crate) fn force_intervention(self: &Arc<Self>, app: &str) {
        let now = self.now_ms();
        let (session_id, timer) = {
            let mut tables = self.tables.lock();

            if tables.surface_active() {
                debug!(app, "forced intervention debounced, surface active");
                return;
            }
            if tables.wake_suppressed_until > now {
                debug!(app, "forced intervention debounced, wake suppressed");
                return;
            }
            if let Some(last) = tables.last_forced_intervention_at {
                if now.saturating_sub(last) < FORCED_INTERVENTION_DEBOUNCE_MS {
                    debug!(app, "forced intervention debounced, fired recently");
                    return;
                }
            }
            {
                let entry = tables.app(app);
                if entry.decision_in_flight_until > now {
                    debug!(app, "forced intervention debounced, decision in flight");
                    return;
                }
            }
            // Final foreground re-check before committing.
            if self.foreground.effective_foreground(now).as_deref() != Some(app) {
                debug!(app, "forced intervention dropped, user left the app");
                return;
            }

            tables.last_forced_intervention_at = Some(now);
            tables.wake_suppressed_until =
                tables.wake_suppressed_until.max(now + FORCED_INTERVENTION_DEBOUNCE_MS);

            let entry = tables.app(app);
            let timer = match entry.qt_state {
                QtState::Active => {
                    // The intervention supersedes the running quick task and
                    // must survive its surface being torn down.
                    info!(app, "forced intervention supersedes active quick task");
                    entry.active_session = None;
                    entry.preserved_intervention = true;
                    entry.qt_state = QtState::InterventionActive;
                    entry.qt_timer.take()
                }
                QtState::Offering => {
                    info!(app, "forced intervention supersedes unanswered offer");
                    entry.offer_session = None;
                    entry.offer_started_at = None;
                    entry.qt_state = QtState::Idle;
                    None
                }
                _ => None,
            };
            (Uuid::new_v4(), timer)
        };

        if let Some(handle) = timer {
            self.timers.cancel(handle);
        }
        let _ = self.emit(WakeReason::ShowIntervention, app, session_id);
    }
}

#[cfg(test)]
#[path = "intention_tests.rs"]
mod tests;
