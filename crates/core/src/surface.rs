// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-way outbound bridge to the UI surface host.

use std::fmt;

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::event::{SurfaceIntent, WakeReason};

/// The UI host has gone away; the intent could not be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitError;

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("surface host unavailable")
    }
}

/// Outbound channel carrying `(wakeReason, app, sessionId)` intents.
///
/// Emission is non-blocking and must happen outside the coordinator lock;
/// the host may call back into the coordinator synchronously on delivery.
#[derive(Clone)]
pub struct SurfaceBridge {
    intent_tx: mpsc::UnboundedSender<SurfaceIntent>,
}

impl SurfaceBridge {
    /// Create a bridge plus the receiving end for the UI host.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SurfaceIntent>) {
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        (Self { intent_tx }, intent_rx)
    }

    /// Deliver one intent to the host.
    pub fn emit(&self, wake_reason: WakeReason, app: &str, session_id: Uuid) -> Result<(), EmitError> {
        debug!(app, session = %session_id, wake = wake_reason.as_str(), "surface emit");
        let intent =
            SurfaceIntent { wake_reason, app: app.to_owned(), session_id };
        self.intent_tx.send(intent).map_err(|_| EmitError)
    }
}
