// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that spawn the real `breakwater` binary and drive
//! the whole offer lifecycle over the JSONL feed.

use serde_json::json;

use breakwater::event::WakeReason;
use breakwater_specs::Feed;

const FEED_APP: &str = "com.example.feed";

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[tokio::test]
async fn monitored_entry_surfaces_an_offer() -> anyhow::Result<()> {
    let mut feed = Feed::spawn(FEED_APP, None)?;

    feed.send(json!({"type": "foreground", "package": FEED_APP, "at_ms": now_ms()})).await?;

    let event = feed.recv().await?;
    assert_eq!(event["type"], "surface");
    assert_eq!(event["wake_reason"], WakeReason::ShowQuickTask.as_str());
    assert_eq!(event["app"], FEED_APP);
    assert!(event["session_id"].is_string());

    feed.shutdown().await
}

#[tokio::test]
async fn confirm_then_finish_reaches_the_post_choice() -> anyhow::Result<()> {
    let mut feed = Feed::spawn(FEED_APP, None)?;

    feed.send(json!({"type": "foreground", "package": FEED_APP, "at_ms": now_ms()})).await?;
    let offer = feed.recv().await?;
    let session_id = offer["session_id"].clone();

    feed.send(json!({
        "type": "quick_task_confirmed",
        "app": FEED_APP,
        "session_id": session_id,
    }))
    .await?;
    feed.send(json!({
        "type": "quick_task_finished",
        "app": FEED_APP,
        "session_id": session_id,
    }))
    .await?;

    let choice = feed.recv().await?;
    assert_eq!(choice["wake_reason"], "SHOW_POST_QUICK_TASK_CHOICE");
    assert_eq!(choice["session_id"], session_id);

    feed.shutdown().await
}

#[tokio::test]
async fn unmonitored_package_stays_silent() -> anyhow::Result<()> {
    let mut feed = Feed::spawn(FEED_APP, None)?;

    feed.send(json!({"type": "foreground", "package": "com.other.app", "at_ms": now_ms()}))
        .await?;
    // Follow with a monitored entry; the first reply must be for it.
    feed.send(json!({"type": "foreground", "package": FEED_APP, "at_ms": now_ms() + 500}))
        .await?;

    let event = feed.recv().await?;
    assert_eq!(event["app"], FEED_APP);

    feed.shutdown().await
}

#[tokio::test]
async fn return_context_consumption_replies_inline() -> anyhow::Result<()> {
    let mut feed = Feed::spawn(FEED_APP, None)?;

    feed.send(json!({
        "type": "set_return_context",
        "context": {
            "context_id": "ctx-1",
            "source_checkpoint": "inbox",
            "trigger": "quick_task_expiry",
            "session_id": "6d9db237-6d23-4f0a-8f8a-111111111111",
            "app": FEED_APP,
            "created_at": now_ms(),
        },
    }))
    .await?;
    feed.send(json!({"type": "set_pending_context", "context_id": "ctx-1"})).await?;
    feed.send(json!({"type": "consume_return_context", "app": FEED_APP})).await?;

    let reply = feed.recv().await?;
    assert_eq!(reply["type"], "return_context");
    assert_eq!(reply["outcome"], "success");
    assert_eq!(reply["context"]["context_id"], "ctx-1");

    feed.shutdown().await
}

#[tokio::test]
async fn consumed_quota_is_durable() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    let mut feed = Feed::spawn(FEED_APP, Some(dir.path()))?;
    feed.send(json!({"type": "foreground", "package": FEED_APP, "at_ms": now_ms()})).await?;
    let offer = feed.recv().await?;
    feed.send(json!({
        "type": "quick_task_confirmed",
        "app": FEED_APP,
        "session_id": offer["session_id"],
    }))
    .await?;
    // Give the write-behind worker a moment before shutdown drains it.
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    feed.shutdown().await?;

    let quota_doc = std::fs::read_to_string(dir.path().join("quota.json"))?;
    let quota: serde_json::Value = serde_json::from_str(&quota_doc)?;
    assert_eq!(quota["remaining"], 2);
    assert_eq!(quota["max_per_15m"], 3);
    Ok(())
}
