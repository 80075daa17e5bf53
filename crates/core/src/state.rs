// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-app state tables and global surface tracking.
//!
//! Everything in [`Tables`] is guarded by the coordinator's single lock.
//! Critical sections are pure in-memory updates; emission to the surface
//! host and timer scheduling happen strictly outside the lock.

use std::collections::HashMap;

use tracing::error;
use uuid::Uuid;

use crate::event::WakeReason;
use crate::timer::TimerHandle;

/// Default grace-period length for a quick task.
pub const DEFAULT_QUICK_TASK_DURATION_MS: u64 = 120_000;

/// Quick-task lifecycle stage for one app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QtState {
    #[default]
    Idle,
    Offering,
    Active,
    PostChoice,
    InterventionActive,
}

impl QtState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Offering => "OFFERING",
            Self::Active => "ACTIVE",
            Self::PostChoice => "POST_CHOICE",
            Self::InterventionActive => "INTERVENTION_ACTIVE",
        }
    }
}

/// Mutable decision state for one monitored app.
///
/// Exactly one of `offer_session` / `active_session` / `post_choice_session`
/// may be set, and its presence must agree with `qt_state`. The coordinator
/// treats a disagreement as a defect and self-repairs via [`Self::force_idle`].
#[derive(Debug, Clone)]
pub struct AppEntry {
    pub qt_state: QtState,
    pub offer_session: Option<Uuid>,
    pub active_session: Option<Uuid>,
    pub post_choice_session: Option<Uuid>,
    /// Session that already caused a quota decrement (idempotency token).
    pub confirmed_session: Option<Uuid>,
    pub offer_started_at: Option<u64>,
    pub session_started_at: Option<u64>,
    pub post_choice_completed_at: Option<u64>,
    /// While `now < qt_protected_until`, no new offer or intervention for
    /// this app; survives foreground excursions during a granted quick task.
    pub qt_protected_until: u64,
    /// While `now < quit_suppressed_until`, entries produce no action.
    pub quit_suppressed_until: u64,
    /// Short window preventing a second decision while an emit is in flight.
    pub decision_in_flight_until: u64,
    pub quick_task_duration_ms: u64,
    pub disallow_quick_task: bool,
    /// Set when an active session turned into an intervention that must
    /// survive surface destruction.
    pub preserved_intervention: bool,
    pub qt_timer: Option<TimerHandle>,
    pub intention_timer: Option<TimerHandle>,
}

impl Default for AppEntry {
    fn default() -> Self {
        Self {
            qt_state: QtState::Idle,
            offer_session: None,
            active_session: None,
            post_choice_session: None,
            confirmed_session: None,
            offer_started_at: None,
            session_started_at: None,
            post_choice_completed_at: None,
            qt_protected_until: 0,
            quit_suppressed_until: 0,
            decision_in_flight_until: 0,
            quick_task_duration_ms: DEFAULT_QUICK_TASK_DURATION_MS,
            disallow_quick_task: false,
            preserved_intervention: false,
            qt_timer: None,
            intention_timer: None,
        }
    }
}

impl AppEntry {
    /// True when the state label and the session IDs disagree.
    fn is_torn(&self) -> bool {
        let offer = self.offer_session.is_some();
        let active = self.active_session.is_some();
        let post = self.post_choice_session.is_some();
        let set = usize::from(offer) + usize::from(active) + usize::from(post);
        match self.qt_state {
            QtState::Idle | QtState::InterventionActive => set != 0,
            QtState::Offering => !(offer && set == 1),
            QtState::Active => !(active && set == 1),
            QtState::PostChoice => !(post && set == 1),
        }
    }

    /// Force IDLE, clearing session identity and the preserved flag.
    ///
    /// `confirmed_session` survives so quota idempotency is not reset, and
    /// suppression/protection windows keep their deadlines.
    pub fn force_idle(&mut self) -> (Option<TimerHandle>, Option<TimerHandle>) {
        self.qt_state = QtState::Idle;
        self.offer_session = None;
        self.active_session = None;
        self.post_choice_session = None;
        self.preserved_intervention = false;
        (self.qt_timer.take(), self.intention_timer.take())
    }

    /// Detect an invariant violation and self-repair by forcing IDLE.
    ///
    /// Returns the timer handles to cancel (outside the lock) if a repair
    /// happened.
    pub fn repair_if_torn(&mut self, app: &str) -> Option<(Option<TimerHandle>, Option<TimerHandle>)> {
        if !self.is_torn() {
            return None;
        }
        error!(
            app,
            state = self.qt_state.as_str(),
            offer = self.offer_session.is_some(),
            active = self.active_session.is_some(),
            post_choice = self.post_choice_session.is_some(),
            "state/session mismatch, forcing IDLE"
        );
        Some(self.force_idle())
    }
}

/// Bookkeeping for the single live surface.
#[derive(Debug, Clone)]
pub struct SurfaceTracking {
    pub instance_id: u64,
    pub app: String,
    pub session_id: Uuid,
    pub wake_reason: WakeReason,
    pub started_at: u64,
}

/// Everything guarded by the coordinator's single lock.
#[derive(Default)]
pub struct Tables {
    pub apps: HashMap<String, AppEntry>,
    /// `Some` while a surface is live; at most one at a time.
    pub surface: Option<SurfaceTracking>,
    /// Global window during which no wake (offer or intervention) happens.
    pub wake_suppressed_until: u64,
    /// Debounce anchor for forced interventions.
    pub last_forced_intervention_at: Option<u64>,
}

impl Tables {
    /// Entry for `app`, created with defaults on first touch.
    pub fn app(&mut self, app: &str) -> &mut AppEntry {
        self.apps.entry(app.to_owned()).or_default()
    }

    pub fn surface_active(&self) -> bool {
        self.surface.is_some()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
