// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use proptest::prelude::*;

use super::{decide, GateAction, GateSnapshot, NoActionReason};
use crate::state::QtState;

/// Snapshot that passes every guard and has quota: decides StartQuickTask.
fn open_snapshot() -> GateSnapshot {
    GateSnapshot {
        is_monitored: true,
        qt_state: QtState::Idle,
        qt_remaining: 1,
        surface_active: false,
        intention_remaining_ms: 0,
        intervention_preserved: false,
        quit_suppressed_for_ms: 0,
        wake_suppressed_for_ms: 0,
        force_entry: false,
        disallow_quick_task: false,
    }
}

#[test]
fn open_snapshot_starts_a_quick_task() {
    assert_eq!(decide(&open_snapshot()), GateAction::StartQuickTask);
}

#[yare::parameterized(
    no_quota     = { GateSnapshot { qt_remaining: 0, ..open_snapshot() } },
    qt_disabled  = { GateSnapshot { disallow_quick_task: true, ..open_snapshot() } },
)]
fn falls_back_to_intervention(snap: GateSnapshot) {
    assert_eq!(decide(&snap), GateAction::StartIntervention);
}

#[yare::parameterized(
    not_monitored = {
        GateSnapshot { is_monitored: false, ..open_snapshot() },
        NoActionReason::NotMonitored
    },
    post_choice_guard = {
        GateSnapshot { qt_state: QtState::PostChoice, ..open_snapshot() },
        NoActionReason::PostChoiceGuard
    },
    intention_active = {
        GateSnapshot { intention_remaining_ms: 30_000, ..open_snapshot() },
        NoActionReason::IntentionActive
    },
    already_offering = {
        GateSnapshot { qt_state: QtState::Offering, ..open_snapshot() },
        NoActionReason::AlreadyInState
    },
    already_active = {
        GateSnapshot { qt_state: QtState::Active, ..open_snapshot() },
        NoActionReason::AlreadyInState
    },
    already_intervening = {
        GateSnapshot { qt_state: QtState::InterventionActive, ..open_snapshot() },
        NoActionReason::AlreadyInState
    },
    preserved_intervention = {
        GateSnapshot { intervention_preserved: true, ..open_snapshot() },
        NoActionReason::InterventionPreserved
    },
    surface_busy = {
        GateSnapshot { surface_active: true, ..open_snapshot() },
        NoActionReason::SurfaceBusy
    },
    quit_suppressed = {
        GateSnapshot { quit_suppressed_for_ms: 1_500, ..open_snapshot() },
        NoActionReason::QuitSuppressed
    },
    wake_suppressed = {
        GateSnapshot { wake_suppressed_for_ms: 700, ..open_snapshot() },
        NoActionReason::WakeSuppressed
    },
)]
fn single_guard_yields_its_reason(snap: GateSnapshot, expected: NoActionReason) {
    assert_eq!(decide(&snap), GateAction::NoAction(expected));
}

#[test]
fn force_entry_bypasses_surface_busy_only() {
    let snap = GateSnapshot { surface_active: true, force_entry: true, ..open_snapshot() };
    assert_eq!(decide(&snap), GateAction::StartQuickTask);

    // Every other guard still applies to a forced entry.
    let snap = GateSnapshot {
        surface_active: true,
        force_entry: true,
        quit_suppressed_for_ms: 500,
        ..open_snapshot()
    };
    assert_eq!(decide(&snap), GateAction::NoAction(NoActionReason::QuitSuppressed));
}

#[test]
fn rule_order_is_stable_under_multiple_guards() {
    // NOT_MONITORED dominates everything.
    let snap = GateSnapshot {
        is_monitored: false,
        qt_state: QtState::PostChoice,
        intention_remaining_ms: 10,
        surface_active: true,
        ..open_snapshot()
    };
    assert_eq!(decide(&snap), GateAction::NoAction(NoActionReason::NotMonitored));

    // POST_CHOICE_GUARD beats an active intention.
    let snap = GateSnapshot {
        qt_state: QtState::PostChoice,
        intention_remaining_ms: 10,
        ..open_snapshot()
    };
    assert_eq!(decide(&snap), GateAction::NoAction(NoActionReason::PostChoiceGuard));

    // Quit suppression beats wake suppression.
    let snap = GateSnapshot {
        quit_suppressed_for_ms: 10,
        wake_suppressed_for_ms: 10,
        ..open_snapshot()
    };
    assert_eq!(decide(&snap), GateAction::NoAction(NoActionReason::QuitSuppressed));
}

fn arb_qt_state() -> impl Strategy<Value = QtState> {
    prop_oneof![
        Just(QtState::Idle),
        Just(QtState::Offering),
        Just(QtState::Active),
        Just(QtState::PostChoice),
        Just(QtState::InterventionActive),
    ]
}

prop_compose! {
    fn arb_snapshot()(
        is_monitored in any::<bool>(),
        qt_state in arb_qt_state(),
        qt_remaining in 0u32..4,
        surface_active in any::<bool>(),
        intention_remaining_ms in prop_oneof![Just(0u64), 1u64..600_000],
        intervention_preserved in any::<bool>(),
        quit_suppressed_for_ms in prop_oneof![Just(0u64), 1u64..5_000],
        wake_suppressed_for_ms in prop_oneof![Just(0u64), 1u64..5_000],
        force_entry in any::<bool>(),
        disallow_quick_task in any::<bool>(),
    ) -> GateSnapshot {
        GateSnapshot {
            is_monitored,
            qt_state,
            qt_remaining,
            surface_active,
            intention_remaining_ms,
            intervention_preserved,
            quit_suppressed_for_ms,
            wake_suppressed_for_ms,
            force_entry,
            disallow_quick_task,
        }
    }
}

proptest! {
    #[test]
    fn decide_is_deterministic(snap in arb_snapshot()) {
        prop_assert_eq!(decide(&snap), decide(&snap));
    }

    #[test]
    fn quick_task_implies_quota_and_permission(snap in arb_snapshot()) {
        if decide(&snap) == GateAction::StartQuickTask {
            prop_assert!(snap.qt_remaining > 0);
            prop_assert!(!snap.disallow_quick_task);
        }
    }

    #[test]
    fn actions_only_fire_from_an_open_gate(snap in arb_snapshot()) {
        if matches!(decide(&snap), GateAction::StartQuickTask | GateAction::StartIntervention) {
            prop_assert!(snap.is_monitored);
            prop_assert_eq!(snap.qt_state, QtState::Idle);
            prop_assert_eq!(snap.intention_remaining_ms, 0);
            prop_assert!(!snap.intervention_preserved);
            prop_assert_eq!(snap.quit_suppressed_for_ms, 0);
            prop_assert_eq!(snap.wake_suppressed_for_ms, 0);
            prop_assert!(!snap.surface_active || snap.force_entry);
        }
    }

    #[test]
    fn suppression_always_blocks(snap in arb_snapshot()) {
        if snap.quit_suppressed_for_ms > 0 || snap.wake_suppressed_for_ms > 0 {
            prop_assert!(matches!(decide(&snap), GateAction::NoAction(_)));
        }
    }
}
