// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The decision gate: pure policy for what happens on a monitored-app entry.
//!
//! The coordinator packages all relevant state into a [`GateSnapshot`] under
//! its lock and calls [`decide`]; the gate itself is deterministic,
//! side-effect-free, and independently testable. Keeping the policy here
//! means suppression semantics, quota rules, and intention priority can
//! evolve without racing with state mutations.

use crate::state::QtState;

/// Everything the gate consults, captured at one instant.
#[derive(Debug, Clone)]
pub struct GateSnapshot {
    pub is_monitored: bool,
    pub qt_state: QtState,
    /// Quick tasks left in the current quota window.
    pub qt_remaining: u32,
    pub surface_active: bool,
    /// Milliseconds until an active intention expires; 0 when none.
    pub intention_remaining_ms: u64,
    pub intervention_preserved: bool,
    /// Milliseconds left on the per-app quit suppression window; 0 when none.
    pub quit_suppressed_for_ms: u64,
    /// Milliseconds left on the global wake suppression window; 0 when none.
    pub wake_suppressed_for_ms: u64,
    /// Forced re-entry (POST_CONTINUE_IMMEDIATE, QT_EXPIRY_QUOTA_ZERO):
    /// allowed to decide while the previous surface is still tearing down.
    pub force_entry: bool,
    pub disallow_quick_task: bool,
}

/// Verdict for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAction {
    NoAction(NoActionReason),
    StartQuickTask,
    StartIntervention,
}

/// Why the gate chose to do nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoActionReason {
    NotMonitored,
    PostChoiceGuard,
    IntentionActive,
    AlreadyInState,
    InterventionPreserved,
    SurfaceBusy,
    QuitSuppressed,
    WakeSuppressed,
}

impl NoActionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotMonitored => "NOT_MONITORED",
            Self::PostChoiceGuard => "POST_CHOICE_GUARD",
            Self::IntentionActive => "INTENTION_ACTIVE",
            Self::AlreadyInState => "ALREADY_IN_STATE",
            Self::InterventionPreserved => "INTERVENTION_PRESERVED",
            Self::SurfaceBusy => "SURFACE_BUSY",
            Self::QuitSuppressed => "QUIT_SUPPRESSED",
            Self::WakeSuppressed => "WAKE_SUPPRESSED",
        }
    }
}

/// Decide what to do for one monitored-app entry.
///
/// Rules are evaluated strictly in order; the first match wins.
pub fn decide(snap: &GateSnapshot) -> GateAction {
    use GateAction::NoAction;
    use NoActionReason::*;

    if !snap.is_monitored {
        return NoAction(NotMonitored);
    }
    if snap.qt_state == QtState::PostChoice {
        return NoAction(PostChoiceGuard);
    }
    if snap.intention_remaining_ms > 0 {
        return NoAction(IntentionActive);
    }
    if matches!(
        snap.qt_state,
        QtState::Active | QtState::Offering | QtState::InterventionActive
    ) {
        return NoAction(AlreadyInState);
    }
    if snap.intervention_preserved {
        return NoAction(InterventionPreserved);
    }
    if snap.surface_active && !snap.force_entry {
        return NoAction(SurfaceBusy);
    }
    if snap.quit_suppressed_for_ms > 0 {
        return NoAction(QuitSuppressed);
    }
    if snap.wake_suppressed_for_ms > 0 {
        return NoAction(WakeSuppressed);
    }
    if snap.qt_remaining > 0 && !snap.disallow_quick_task {
        return GateAction::StartQuickTask;
    }
    GateAction::StartIntervention
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
