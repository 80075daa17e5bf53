// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitored-app entry: pre-gate suppression checks, the gate call, and the
//! application of its verdict.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::event::{EntrySource, WakeReason};
use crate::gate::{self, GateAction};
use crate::state::QtState;

use super::{Coordinator, DECISION_IN_FLIGHT_MS, OFFER_MAX_AGE_MS, POST_CHOICE_COOLDOWN_MS, STALE_SURFACE_MS};

/// Work to perform after the lock is released.
#[derive(Default)]
struct EntryOutcome {
    /// Tear-down intent for a force-reset stale surface.
    finish_stale: Option<(String, Uuid)>,
    emit_offer: Option<Uuid>,
    emit_intervention: Option<Uuid>,
}

impl Coordinator {
    /// Inbound path from the foreground tracker: one call per raw
    /// foreground change. Classification, duplicate collapse, and the
    /// monitored-set check happen here; everything that survives becomes a
    /// monitored-app entry.
    pub fn on_foreground_changed(self: &Arc<Self>, package: &str, at_ms: u64) {
        let Some(app) = self.foreground.observe(package, at_ms) else {
            return;
        };
        if !self.monitored.contains(&app) {
            debug!(app, "foreground app not monitored");
            return;
        }
        self.on_monitored_app_entry(&app, EntrySource::Accessibility, false);
    }

    /// Entry point for every monitored-app foreground entry.
    ///
    /// `force` marks internal re-entries (POST_CONTINUE_IMMEDIATE,
    /// QT_EXPIRY_QUOTA_ZERO) that may decide while the previous surface is
    /// still tearing down.
    pub fn on_monitored_app_entry(self: &Arc<Self>, app: &str, source: EntrySource, force: bool) {
        let now = self.now_ms();
        let outcome = {
            let mut tables = self.tables.lock();
            let mut outcome = EntryOutcome::default();

            {
                let entry = tables.app(app);
                if let Some(handles) = entry.repair_if_torn(app) {
                    drop(tables);
                    self.cancel_timers(handles);
                    tables = self.tables.lock();
                }
            }

            {
                let entry = tables.app(app);

                // Pre-gate suppression checks; expired windows are cleared.
                if entry.quit_suppressed_until > now {
                    debug!(app, source = source.as_str(), "entry ignored, quit suppressed");
                    return;
                }
                entry.quit_suppressed_until = 0;

                if let Some(done) = entry.post_choice_completed_at {
                    if now.saturating_sub(done) < POST_CHOICE_COOLDOWN_MS {
                        debug!(app, source = source.as_str(), "entry ignored, post-choice cooldown");
                        return;
                    }
                    entry.post_choice_completed_at = None;
                }

                if entry.qt_protected_until > now {
                    debug!(app, source = source.as_str(), "entry ignored, inside protection window");
                    return;
                }

                if entry.decision_in_flight_until > now {
                    debug!(app, source = source.as_str(), "entry ignored, decision in flight");
                    return;
                }

                // An unanswered offer eventually goes stale.
                if entry.qt_state == QtState::Offering {
                    let stale = entry
                        .offer_started_at
                        .is_none_or(|at| now.saturating_sub(at) >= OFFER_MAX_AGE_MS);
                    if stale {
                        info!(app, "stale offer cleared on entry");
                        entry.qt_state = QtState::Idle;
                        entry.offer_session = None;
                        entry.offer_started_at = None;
                    }
                }
            }

            // Stale-surface recovery: a host that never delivered its
            // destroy callback would otherwise block decisions forever.
            if let Some(ref tracked) = tables.surface {
                if now.saturating_sub(tracked.started_at) >= STALE_SURFACE_MS {
                    warn!(
                        app = %tracked.app,
                        instance = tracked.instance_id,
                        "stale surface force-reset"
                    );
                    outcome.finish_stale = Some((tracked.app.clone(), tracked.session_id));
                    tables.surface = None;
                }
            }

            let snapshot = self.snapshot_for(&mut tables, app, now, force);
            let action = gate::decide(&snapshot);

            match action {
                GateAction::NoAction(reason) => {
                    info!(app, source = source.as_str(), reason = reason.as_str(), "gate: no action");
                }
                GateAction::StartQuickTask => {
                    let session_id = Uuid::new_v4();
                    let entry = tables.app(app);
                    entry.qt_state = QtState::Offering;
                    entry.offer_session = Some(session_id);
                    entry.offer_started_at = Some(now);
                    entry.decision_in_flight_until = now + DECISION_IN_FLIGHT_MS;
                    info!(app, session = %session_id, "quick task offer allocated");
                    outcome.emit_offer = Some(session_id);
                }
                GateAction::StartIntervention => {
                    let entry = tables.app(app);
                    // Intervention supersedes an unanswered offer.
                    if entry.offer_session.take().is_some() {
                        info!(app, "offer superseded by intervention");
                        entry.qt_state = QtState::Idle;
                        entry.offer_started_at = None;
                    }
                    let session_id = Uuid::new_v4();
                    info!(app, session = %session_id, "intervention requested");
                    outcome.emit_intervention = Some(session_id);
                }
            }
            outcome
        };

        if let Some((stale_app, stale_session)) = outcome.finish_stale {
            let _ = self.emit(WakeReason::FinishSurface, &stale_app, stale_session);
        }
        if let Some(session_id) = outcome.emit_offer {
            if !self.emit(WakeReason::ShowQuickTask, app, session_id) {
                self.roll_back_offer(app, session_id);
            }
        }
        if let Some(session_id) = outcome.emit_intervention {
            let _ = self.emit(WakeReason::ShowIntervention, app, session_id);
        }
    }

    /// Undo a just-allocated offer whose emit failed, if it is still current.
    fn roll_back_offer(&self, app: &str, session_id: Uuid) {
        let mut tables = self.tables.lock();
        let entry = tables.app(app);
        if entry.offer_session == Some(session_id) {
            warn!(app, session = %session_id, "offer rolled back after emit failure");
            entry.offer_session = None;
            entry.offer_started_at = None;
            entry.qt_state = QtState::Idle;
            entry.decision_in_flight_until = 0;
        }
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
