// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Quick-task lifecycle: confirm, decline, expiry, manual finish, and the
//! post-choice answer. Every callback carries the session ID it was issued
//! under; stale sessions are logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::event::{EntrySource, PostChoice, WakeReason};
use crate::state::QtState;

use super::{Coordinator, QUIT_SUPPRESSION_MS};

impl Coordinator {
    /// The user accepted the offered quick task.
    pub fn on_quick_task_confirmed(self: &Arc<Self>, app: &str, session_id: Uuid) {
        let now = self.now_ms();
        let (duration_ms, prior_timer) = {
            let mut tables = self.tables.lock();
            let entry = tables.app(app);
            if entry.qt_state != QtState::Offering || entry.offer_session != Some(session_id) {
                info!(
                    app,
                    session = %session_id,
                    state = entry.qt_state.as_str(),
                    "stale confirm dropped"
                );
                return;
            }
            entry.offer_session = None;
            entry.offer_started_at = None;
            entry.qt_state = QtState::Active;
            entry.active_session = Some(session_id);
            entry.session_started_at = Some(now);
            entry.qt_protected_until = now + entry.quick_task_duration_ms;

            // Idempotent decrement: a duplicate confirm for the same
            // session must not bill the quota twice.
            if entry.confirmed_session != Some(session_id) {
                entry.confirmed_session = Some(session_id);
                let remaining = self.quota.snapshot().remaining.saturating_sub(1);
                self.quota.set_remaining(remaining);
                info!(app, session = %session_id, remaining, "quick task confirmed, quota consumed");
            } else {
                info!(app, session = %session_id, "quick task confirmed, quota already billed");
            }

            (entry.quick_task_duration_ms, entry.qt_timer.take())
        };

        if let Some(handle) = prior_timer {
            self.timers.cancel(handle);
        }
        self.arm_qt_timer(app, session_id, duration_ms);
    }

    /// Schedule the expiry timer and record its handle, unless the session
    /// has already moved on.
    fn arm_qt_timer(self: &Arc<Self>, app: &str, session_id: Uuid, duration_ms: u64) {
        let coordinator = Arc::clone(self);
        let timer_app = app.to_owned();
        let handle = self.timers.schedule(Duration::from_millis(duration_ms), move || {
            coordinator.on_quick_task_timer_expired(&timer_app, session_id);
        });

        let mut tables = self.tables.lock();
        let entry = tables.app(app);
        if entry.active_session == Some(session_id) {
            entry.qt_timer = Some(handle);
        } else {
            // The session ended between scheduling and recording.
            drop(tables);
            self.timers.cancel(handle);
        }
    }

    /// The user turned the offer down.
    pub fn on_quick_task_declined(&self, app: &str, session_id: Uuid) {
        let mut tables = self.tables.lock();
        let entry = tables.app(app);
        if entry.qt_state != QtState::Offering || entry.offer_session != Some(session_id) {
            info!(app, session = %session_id, "stale decline dropped");
            return;
        }
        info!(app, session = %session_id, "quick task declined");
        entry.offer_session = None;
        entry.offer_started_at = None;
        entry.qt_state = QtState::Idle;
    }

    /// The grace period ran out. Whether the post-choice screen appears is
    /// gated on the foreground *at fire time*: deciding at scheduling time
    /// produces visible surprises.
    pub fn on_quick_task_timer_expired(self: &Arc<Self>, app: &str, session_id: Uuid) {
        let now = self.now_ms();
        let show_choice = {
            let mut tables = self.tables.lock();
            let entry = tables.app(app);
            if entry.qt_state != QtState::Active || entry.active_session != Some(session_id) {
                debug!(app, session = %session_id, "stale expiry ignored");
                return;
            }
            entry.qt_timer = None;

            let effective = self.foreground.effective_foreground(now);
            if effective.as_deref() == Some(app) {
                entry.qt_state = QtState::PostChoice;
                entry.post_choice_session = Some(session_id);
                entry.active_session = None;
                info!(app, session = %session_id, "quick task expired on app");
                true
            } else {
                // The user already left: no screen. The protection window
                // is intentionally preserved so a prompt return is not
                // immediately re-gated.
                entry.qt_state = QtState::Idle;
                entry.active_session = None;
                info!(app, session = %session_id, foreground = ?effective, "quick task expired while away");
                false
            }
        };

        if show_choice && !self.emit(WakeReason::ShowPostQuickTaskChoice, app, session_id) {
            self.roll_back_post_choice(app, session_id);
        }
    }

    /// The user tapped "done" before the timer ran out. Quota-aware: with
    /// quota left the post-choice screen appears as usual; with none the
    /// state clears and the entry is re-evaluated, which lands on an
    /// intervention.
    pub fn on_quick_task_finished(self: &Arc<Self>, app: &str, session_id: Uuid) {
        enum Next {
            ShowChoice,
            Reevaluate,
        }
        let (next, prior_timer) = {
            let mut tables = self.tables.lock();
            let entry = tables.app(app);
            if entry.qt_state != QtState::Active || entry.active_session != Some(session_id) {
                info!(app, session = %session_id, "stale finish dropped");
                return;
            }
            let prior_timer = entry.qt_timer.take();
            entry.active_session = None;
            // A finished session no longer warrants its protection window.
            entry.qt_protected_until = 0;

            if self.quota.snapshot().remaining > 0 {
                entry.qt_state = QtState::PostChoice;
                entry.post_choice_session = Some(session_id);
                info!(app, session = %session_id, "quick task finished early");
                (Next::ShowChoice, prior_timer)
            } else {
                entry.qt_state = QtState::Idle;
                info!(app, session = %session_id, "quick task finished early, quota exhausted");
                (Next::Reevaluate, prior_timer)
            }
        };

        if let Some(handle) = prior_timer {
            self.timers.cancel(handle);
        }
        match next {
            Next::ShowChoice => {
                if !self.emit(WakeReason::ShowPostQuickTaskChoice, app, session_id) {
                    self.roll_back_post_choice(app, session_id);
                }
            }
            Next::Reevaluate => {
                self.on_monitored_app_entry(app, EntrySource::QtExpiryQuotaZero, true);
            }
        }
    }

    /// The user answered the post-quick-task screen.
    pub fn on_post_quick_task_choice(
        self: &Arc<Self>,
        app: &str,
        session_id: Uuid,
        choice: PostChoice,
    ) {
        let now = self.now_ms();
        let (reenter, prior_timer) = {
            let mut tables = self.tables.lock();
            let entry = tables.app(app);
            if entry.post_choice_session != Some(session_id) {
                // Clean up anyway: a stuck POST_CHOICE would block the app
                // forever via the post-choice guard.
                warn!(
                    app,
                    session = %session_id,
                    expected = ?entry.post_choice_session,
                    "post-choice session mismatch, cleaning up defensively"
                );
            }
            let prior_timer = entry.qt_timer.take();
            entry.post_choice_session = None;
            entry.active_session = None;
            entry.qt_state = QtState::Idle;

            let reenter = match choice {
                PostChoice::Quit => {
                    entry.quit_suppressed_until = now + QUIT_SUPPRESSION_MS;
                    entry.post_choice_completed_at = Some(now);
                    info!(app, session = %session_id, "post-choice QUIT");
                    false
                }
                PostChoice::Continue => {
                    entry.quit_suppressed_until = 0;
                    entry.qt_protected_until = 0;
                    info!(app, session = %session_id, "post-choice CONTINUE");
                    true
                }
            };
            (reenter, prior_timer)
        };

        if let Some(handle) = prior_timer {
            self.timers.cancel(handle);
        }
        if reenter {
            self.on_monitored_app_entry(app, EntrySource::PostContinueImmediate, true);
        }
    }

    /// Undo a post-choice transition whose emit failed; the user must not
    /// be trapped behind the post-choice guard with no screen to answer.
    fn roll_back_post_choice(&self, app: &str, session_id: Uuid) {
        let mut tables = self.tables.lock();
        let entry = tables.app(app);
        if entry.post_choice_session == Some(session_id) {
            warn!(app, session = %session_id, "post-choice rolled back after emit failure");
            entry.post_choice_session = None;
            entry.qt_state = QtState::Idle;
        }
    }
}

#[cfg(test)]
#[path = "quick_task_tests.rs"]
mod tests;
