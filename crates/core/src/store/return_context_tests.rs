// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::super::{ConsumeOutcome, Persister, ReturnContext, ReturnContextStore};
use super::RETURN_CONTEXT_TTL_MS;

fn store() -> ReturnContextStore {
    ReturnContextStore::restore(Persister::spawn(None, CancellationToken::new()), None)
}

fn context(app: &str, created_at: u64) -> ReturnContext {
    ReturnContext {
        context_id: "ctx-1".to_owned(),
        source_checkpoint: "reading_list".to_owned(),
        trigger: "quick_task_expiry".to_owned(),
        session_id: Uuid::new_v4(),
        app: app.to_owned(),
        created_at,
    }
}

#[tokio::test]
async fn consume_without_pending_is_no_pending() {
    let s = store();
    s.set_context(context("com.example.feed", 0));
    assert_eq!(s.consume_pending_for("com.example.feed", 1_000), ConsumeOutcome::NoPending);
}

#[tokio::test]
async fn consume_succeeds_and_clears_both_slots() {
    let s = store();
    let ctx = context("com.example.feed", 0);
    s.set_context(ctx.clone());
    s.set_pending("ctx-1");

    assert_eq!(
        s.consume_pending_for("com.example.feed", 1_000),
        ConsumeOutcome::Success(ctx)
    );
    // Consumed: a second attempt finds nothing.
    assert_eq!(s.consume_pending_for("com.example.feed", 1_000), ConsumeOutcome::NoPending);
}

#[tokio::test]
async fn wrong_app_clears_nothing() {
    let s = store();
    let ctx = context("com.example.feed", 0);
    s.set_context(ctx.clone());
    s.set_pending("ctx-1");

    assert_eq!(s.consume_pending_for("com.example.mail", 1_000), ConsumeOutcome::WrongApp);
    // The owning app can still consume it.
    assert_eq!(
        s.consume_pending_for("com.example.feed", 1_000),
        ConsumeOutcome::Success(ctx)
    );
}

#[tokio::test]
async fn expired_context_is_cleared_on_consume() {
    let s = store();
    s.set_context(context("com.example.feed", 0));
    s.set_pending("ctx-1");

    assert_eq!(
        s.consume_pending_for("com.example.feed", RETURN_CONTEXT_TTL_MS),
        ConsumeOutcome::Expired
    );
    assert_eq!(s.consume_pending_for("com.example.feed", RETURN_CONTEXT_TTL_MS), ConsumeOutcome::NoPending);
}

#[tokio::test]
async fn pending_pointer_must_match_the_stored_context() {
    let s = store();
    s.set_context(context("com.example.feed", 0));
    s.set_pending("ctx-other");
    assert_eq!(s.consume_pending_for("com.example.feed", 1_000), ConsumeOutcome::NoPending);
}

#[tokio::test]
async fn clear_removes_everything() {
    let s = store();
    s.set_context(context("com.example.feed", 0));
    s.set_pending("ctx-1");
    s.clear();
    assert_eq!(s.consume_pending_for("com.example.feed", 1_000), ConsumeOutcome::NoPending);
}
