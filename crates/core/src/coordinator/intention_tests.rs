// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::event::WakeReason;
use crate::state::QtState;
use crate::test_support::{advance_ms, TestCoreBuilder, FEED, OTHER};

#[tokio::test(start_paused = true)]
async fn intention_expiry_on_app_forces_an_intervention() {
    let mut core = TestCoreBuilder::new().build();
    // Seed the foreground; the unanswered offer is declined so the app sits
    // in IDLE when the intention expires.
    core.enter(FEED, 0);
    let offer = core.expect_wake(WakeReason::ShowQuickTask, FEED);
    core.coordinator.on_quick_task_declined(FEED, offer.session_id);

    core.coordinator.set_intention_until(FEED, 60_000);
    core.settle().await;
    advance_ms(60_000).await;

    core.expect_wake(WakeReason::ShowIntervention, FEED);
    assert_eq!(core.intentions.peek(FEED), None);
}

#[tokio::test(start_paused = true)]
async fn intention_expiry_while_away_clears_silently() {
    let mut core = TestCoreBuilder::new().build();
    core.enter(FEED, 0);
    core.expect_wake(WakeReason::ShowQuickTask, FEED);

    core.coordinator.set_intention_until(FEED, 60_000);
    core.settle().await;
    core.enter(OTHER, 30_000);
    advance_ms(60_000).await;

    core.expect_no_intent();
    assert_eq!(core.intentions.peek(FEED), None);
}

#[tokio::test(start_paused = true)]
async fn active_intention_gates_entries() {
    let mut core = TestCoreBuilder::new().build();
    core.coordinator.set_intention_until(FEED, 60_000);
    core.settle().await;

    core.enter(FEED, 1_000);
    core.expect_no_intent();
}

#[tokio::test(start_paused = true)]
async fn setting_a_past_deadline_clears_instead() {
    let mut core = TestCoreBuilder::new().build();
    core.coordinator.set_intention_until(FEED, 60_000);
    core.settle().await;
    advance_ms(10_000).await;

    core.coordinator.set_intention_until(FEED, 5_000);
    assert_eq!(core.intentions.peek(FEED), None);

    // The superseded 60 s timer fires into nothing.
    advance_ms(60_000).await;
    core.expect_no_intent();
}

#[tokio::test(start_paused = true)]
async fn resetting_an_intention_rearms_the_timer() {
    let mut core = TestCoreBuilder::new().build();
    core.enter(FEED, 0);
    core.expect_wake(WakeReason::ShowQuickTask, FEED);

    core.coordinator.set_intention_until(FEED, 60_000);
    core.settle().await;
    core.coordinator.set_intention_until(FEED, 90_000);
    core.settle().await;

    // The 60 s deadline no longer matches the store: nothing happens.
    advance_ms(60_000).await;
    core.expect_no_intent();
    assert_eq!(core.intentions.peek(FEED), Some(90_000));

    advance_ms(30_000).await;
    core.expect_wake(WakeReason::ShowIntervention, FEED);
}

#[tokio::test(start_paused = true)]
async fn clear_intention_cancels_the_timer() {
    let mut core = TestCoreBuilder::new().build();
    core.enter(FEED, 0);
    core.expect_wake(WakeReason::ShowQuickTask, FEED);

    core.coordinator.set_intention_until(FEED, 60_000);
    core.settle().await;
    core.coordinator.clear_intention(FEED, "user cancelled");
    core.settle().await;

    advance_ms(90_000).await;
    core.expect_no_intent();
}

#[tokio::test(start_paused = true)]
async fn forced_intervention_is_debounced_by_a_live_surface() {
    let mut core = TestCoreBuilder::new().build();
    core.enter(FEED, 0);
    let offer = core.expect_wake(WakeReason::ShowQuickTask, FEED);
    core.open_surface(&offer);

    core.coordinator.set_intention_until(FEED, 60_000);
    core.settle().await;
    advance_ms(60_000).await;

    // The intention cleared but no intervention was surfaced.
    core.expect_no_intent();
    assert_eq!(core.intentions.peek(FEED), None);
}

#[tokio::test(start_paused = true)]
async fn forced_intervention_supersedes_an_active_quick_task() {
    let mut core = TestCoreBuilder::new().build();
    core.enter(FEED, 0);
    let offer = core.expect_wake(WakeReason::ShowQuickTask, FEED);
    core.coordinator.on_quick_task_confirmed(FEED, offer.session_id);
    core.settle().await;

    core.coordinator.set_intention_until(FEED, 60_000);
    core.settle().await;
    advance_ms(60_000).await;

    core.expect_wake(WakeReason::ShowIntervention, FEED);
    let (state, preserved, active) = {
        let mut tables = core.coordinator.tables();
        let entry = tables.app(FEED);
        (entry.qt_state, entry.preserved_intervention, entry.active_session)
    };
    assert_eq!(state, QtState::InterventionActive);
    assert!(preserved);
    assert_eq!(active, None);

    // The superseded session's expiry timer was cancelled.
    advance_ms(120_000).await;
    core.expect_no_intent();
}

#[tokio::test(start_paused = true)]
async fn wake_suppression_debounces_forced_interventions() {
    let mut core = TestCoreBuilder::new().build();
    core.enter(FEED, 0);
    core.expect_wake(WakeReason::ShowQuickTask, FEED);

    core.coordinator.set_intention_until(FEED, 60_000);
    core.settle().await;
    advance_ms(59_000).await;
    core.coordinator.suppress_wake_for(10_000);
    advance_ms(1_000).await;

    core.expect_no_intent();
    assert_eq!(core.intentions.peek(FEED), None);
}
