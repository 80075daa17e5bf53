// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical wake labels carried to the surface host.
///
/// The host translates these into whatever screen it chooses; the core is
/// agnostic to presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WakeReason {
    ShowQuickTask,
    ShowIntervention,
    ShowPostQuickTaskChoice,
    FinishSurface,
}

impl WakeReason {
    /// Wire-format string for this wake reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShowQuickTask => "SHOW_QUICK_TASK",
            Self::ShowIntervention => "SHOW_INTERVENTION",
            Self::ShowPostQuickTaskChoice => "SHOW_POST_QUICK_TASK_CHOICE",
            Self::FinishSurface => "FINISH_SURFACE",
        }
    }
}

/// Where a monitored-app entry notification originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntrySource {
    /// Raw foreground change from the OS accessibility-like stream.
    Accessibility,
    /// Forced re-evaluation after a manual finish with no quota left.
    QtExpiryQuotaZero,
    /// Immediate re-entry after a CONTINUE post-choice.
    PostContinueImmediate,
}

impl EntrySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accessibility => "ACCESSIBILITY",
            Self::QtExpiryQuotaZero => "QT_EXPIRY_QUOTA_ZERO",
            Self::PostContinueImmediate => "POST_CONTINUE_IMMEDIATE",
        }
    }
}

/// The user's answer on the post-quick-task screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostChoice {
    Quit,
    Continue,
}

impl PostChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quit => "QUIT",
            Self::Continue => "CONTINUE",
        }
    }
}

/// Outbound intent to the UI surface host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceIntent {
    pub wake_reason: WakeReason,
    pub app: String,
    pub session_id: Uuid,
}

/// One raw foreground change from the OS event source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForegroundEvent {
    pub package: String,
    pub at_ms: u64,
}
