// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Newline-delimited-JSON harness around the core.
//!
//! The external foreground producer and UI host drive the core with one
//! JSON object per stdin line; surface intents and replies leave as one
//! JSON object per stdout line. Malformed lines are logged and dropped —
//! nothing propagates back to the producer.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use uuid::Uuid;

use crate::event::{PostChoice, WakeReason};
use crate::run::Core;
use crate::store::{ConsumeOutcome, ReturnContext};

/// One inbound request line.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedRequest {
    Foreground { package: String, at_ms: u64 },
    QuickTaskConfirmed { app: String, session_id: Uuid },
    QuickTaskDeclined { app: String, session_id: Uuid },
    QuickTaskFinished { app: String, session_id: Uuid },
    PostQuickTaskChoice { app: String, session_id: Uuid, choice: PostChoice },
    SurfaceOpened { app: String, session_id: Uuid, wake_reason: WakeReason, instance_id: u64 },
    SurfaceDestroyed {
        app: Option<String>,
        session_id: Option<Uuid>,
        wake_reason: Option<WakeReason>,
        instance_id: u64,
    },
    InterventionDismissed { app: String },
    SetIntention { app: String, until_ms: u64 },
    ClearIntention { app: String },
    SetQuickTaskMaxQuota { max_per_15m: u32 },
    SetQuickTaskDuration { app: String, duration_ms: u64 },
    SetQuickTaskDisallowed { app: String, disallow: bool },
    UpdateMonitoredApps { apps: Vec<String> },
    SuppressWake { duration_ms: u64 },
    SetReturnContext { context: ReturnContext },
    SetPendingContext { context_id: String },
    ConsumeReturnContext { app: String },
}

/// One outbound line.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    Surface { wake_reason: WakeReason, app: String, session_id: Uuid },
    ReturnContext {
        app: String,
        outcome: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        context: Option<ReturnContext>,
    },
}

/// Apply one request. Returns a reply line for request/response shapes.
pub fn dispatch(core: &Core, request: FeedRequest) -> Option<FeedEvent> {
    match request {
        FeedRequest::Foreground { package, at_ms } => {
            core.coordinator.on_foreground_changed(&package, at_ms);
            None
        }
        FeedRequest::QuickTaskConfirmed { app, session_id } => {
            core.coordinator.on_quick_task_confirmed(&app, session_id);
            None
        }
        FeedRequest::QuickTaskDeclined { app, session_id } => {
            core.coordinator.on_quick_task_declined(&app, session_id);
            None
        }
        FeedRequest::QuickTaskFinished { app, session_id } => {
            core.coordinator.on_quick_task_finished(&app, session_id);
            None
        }
        FeedRequest::PostQuickTaskChoice { app, session_id, choice } => {
            core.coordinator.on_post_quick_task_choice(&app, session_id, choice);
            None
        }
        FeedRequest::SurfaceOpened { app, session_id, wake_reason, instance_id } => {
            core.coordinator.on_surface_opened(&app, session_id, wake_reason, instance_id);
            None
        }
        FeedRequest::SurfaceDestroyed { app, session_id, wake_reason, instance_id } => {
            core.coordinator.on_surface_destroyed(
                app.as_deref(),
                session_id,
                wake_reason,
                instance_id,
            );
            None
        }
        FeedRequest::InterventionDismissed { app } => {
            core.coordinator.on_intervention_dismissed(&app);
            None
        }
        FeedRequest::SetIntention { app, until_ms } => {
            core.coordinator.set_intention_until(&app, until_ms);
            None
        }
        FeedRequest::ClearIntention { app } => {
            core.coordinator.clear_intention(&app, "host request");
            None
        }
        FeedRequest::SetQuickTaskMaxQuota { max_per_15m } => {
            core.coordinator.set_quick_task_max_quota(max_per_15m);
            None
        }
        FeedRequest::SetQuickTaskDuration { app, duration_ms } => {
            core.coordinator.set_quick_task_duration_for_app(&app, duration_ms);
            None
        }
        FeedRequest::SetQuickTaskDisallowed { app, disallow } => {
            core.coordinator.set_quick_task_disallowed(&app, disallow);
            None
        }
        FeedRequest::UpdateMonitoredApps { apps } => {
            core.coordinator.update_monitored_apps(apps);
            None
        }
        FeedRequest::SuppressWake { duration_ms } => {
            core.coordinator.suppress_wake_for(duration_ms);
            None
        }
        FeedRequest::SetReturnContext { context } => {
            core.return_context.set_context(context);
            None
        }
        FeedRequest::SetPendingContext { context_id } => {
            core.return_context.set_pending(&context_id);
            None
        }
        FeedRequest::ConsumeReturnContext { app } => {
            let now = core.clock.now_ms();
            let (outcome, context) = match core.return_context.consume_pending_for(&app, now) {
                ConsumeOutcome::NoPending => ("no_pending", None),
                ConsumeOutcome::WrongApp => ("wrong_app", None),
                ConsumeOutcome::Expired => ("expired", None),
                ConsumeOutcome::Success(ctx) => ("success", Some(ctx)),
            };
            Some(FeedEvent::ReturnContext { app, outcome, context })
        }
    }
}

/// Run the feed loop until stdin closes or shutdown is requested.
pub async fn run(mut core: Core) -> anyhow::Result<()> {
    let Some(mut intents) = core.intents.take() else {
        anyhow::bail!("surface intent receiver already taken");
    };
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();
    let shutdown = core.shutdown.clone();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                shutdown.cancel();
                break;
            }
            intent = intents.recv() => {
                let Some(intent) = intent else { break };
                let event = FeedEvent::Surface {
                    wake_reason: intent.wake_reason,
                    app: intent.app,
                    session_id: intent.session_id,
                };
                write_line(&mut stdout, &event).await?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("event stream closed");
                    shutdown.cancel();
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<FeedRequest>(&line) {
                    Ok(request) => {
                        if let Some(reply) = dispatch(&core, request) {
                            write_line(&mut stdout, &reply).await?;
                        }
                    }
                    Err(e) => warn!(error = %e, "malformed feed line dropped"),
                }
            }
        }
    }
    Ok(())
}

async fn write_line(
    stdout: &mut tokio::io::Stdout,
    event: &FeedEvent,
) -> anyhow::Result<()> {
    let mut line = serde_json::to_string(event)?;
    line.push('\n');
    stdout.write_all(line.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "feed_tests.rs"]
mod tests;
