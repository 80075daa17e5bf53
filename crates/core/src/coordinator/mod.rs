// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The coordinator: sole mutator of the state tables.
//!
//! Every entry point acquires the single lock, applies its decision, and
//! releases the lock before emitting to the surface host or touching
//! timers. The host may call back into the coordinator synchronously on
//! delivery, so emitting under the lock would deadlock.
//!
//! Lock ordering: tables → store caches → foreground tracker. None of the
//! inner locks ever acquires an outer one.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::event::WakeReason;
use crate::foreground::ForegroundTracker;
use crate::gate::GateSnapshot;
use crate::state::{QtState, Tables};
use crate::store::{IntentionStore, MonitoredAppsStore, QuotaStore};
use crate::surface::SurfaceBridge;
use crate::timer::{TimerHandle, TimerService};

mod entry;
mod intention;
mod quick_task;
mod surface;

/// Cooldown after a post-choice completes before new entries are gated.
pub const POST_CHOICE_COOLDOWN_MS: u64 = 2_000;

/// How long a decision blocks a second one while its emit is in flight.
pub const DECISION_IN_FLIGHT_MS: u64 = 800;

/// An unanswered offer older than this is stale and cleared on entry.
pub const OFFER_MAX_AGE_MS: u64 = 30_000;

/// A surface live longer than this is presumed leaked and force-reset.
pub const STALE_SURFACE_MS: u64 = 120_000;

/// Quit suppression window after a QUIT post-choice.
pub const QUIT_SUPPRESSION_MS: u64 = 2_000;

/// Minimum spacing between forced interventions.
pub const FORCED_INTERVENTION_DEBOUNCE_MS: u64 = 800;

/// Window for the destroy-callback fallback offering cleanup.
pub const DESTROY_FALLBACK_OFFER_AGE_MS: u64 = 10_000;

/// Central decision component; one instance per process.
pub struct Coordinator {
    tables: Mutex<Tables>,
    clock: Clock,
    timers: Arc<TimerService>,
    bridge: SurfaceBridge,
    quota: Arc<QuotaStore>,
    monitored: Arc<MonitoredAppsStore>,
    intentions: Arc<IntentionStore>,
    foreground: Arc<ForegroundTracker>,
}

impl Coordinator {
    pub fn new(
        clock: Clock,
        timers: Arc<TimerService>,
        bridge: SurfaceBridge,
        quota: Arc<QuotaStore>,
        monitored: Arc<MonitoredAppsStore>,
        intentions: Arc<IntentionStore>,
        foreground: Arc<ForegroundTracker>,
    ) -> Arc<Self> {
        Arc::new(Self {
            tables: Mutex::new(Tables::default()),
            clock,
            timers,
            bridge,
            quota,
            monitored,
            intentions,
            foreground,
        })
    }

    pub(crate) fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Package the gate's view of the world. Called under the tables lock.
    fn snapshot_for(&self, tables: &mut Tables, app: &str, now: u64, force: bool) -> GateSnapshot {
        let surface_active = tables.surface_active();
        let wake_suppressed_for_ms = tables.wake_suppressed_until.saturating_sub(now);
        let entry = tables.app(app);
        GateSnapshot {
            is_monitored: self.monitored.contains(app),
            qt_state: entry.qt_state,
            qt_remaining: self.quota.snapshot().remaining,
            surface_active,
            intention_remaining_ms: self.intentions.remaining_ms(app, now),
            intervention_preserved: entry.preserved_intervention,
            quit_suppressed_for_ms: entry.quit_suppressed_until.saturating_sub(now),
            wake_suppressed_for_ms,
            force_entry: force,
            disallow_quick_task: entry.disallow_quick_task,
        }
    }

    /// Emit outside the lock; failures are the caller's to handle.
    fn emit(&self, wake_reason: WakeReason, app: &str, session_id: Uuid) -> bool {
        match self.bridge.emit(wake_reason, app, session_id) {
            Ok(()) => true,
            Err(e) => {
                warn!(app, session = %session_id, wake = wake_reason.as_str(), error = %e, "surface emit failed");
                false
            }
        }
    }

    fn cancel_timers(&self, handles: (Option<TimerHandle>, Option<TimerHandle>)) {
        if let Some(h) = handles.0 {
            self.timers.cancel(h);
        }
        if let Some(h) = handles.1 {
            self.timers.cancel(h);
        }
    }

    // ---------------------------------------------------------------------
    // Configuration setters (cached synchronously, persisted asynchronously)
    // ---------------------------------------------------------------------

    pub fn set_quick_task_max_quota(&self, max_per_15m: u32) {
        self.quota.set_max(max_per_15m, self.now_ms());
    }

    pub fn set_quick_task_duration_for_app(&self, app: &str, duration_ms: u64) {
        if duration_ms == 0 {
            warn!(app, "ignoring zero quick task duration");
            return;
        }
        let mut tables = self.tables.lock();
        tables.app(app).quick_task_duration_ms = duration_ms;
        info!(app, duration_ms, "quick task duration configured");
    }

    pub fn set_quick_task_disallowed(&self, app: &str, disallow: bool) {
        let mut tables = self.tables.lock();
        tables.app(app).disallow_quick_task = disallow;
        info!(app, disallow, "quick task availability configured");
    }

    pub fn update_monitored_apps(&self, apps: impl IntoIterator<Item = String>) {
        self.monitored.update(apps);
    }

    /// Arm (or extend) the global wake suppression window.
    pub fn suppress_wake_for(&self, duration_ms: u64) {
        let until = self.now_ms() + duration_ms;
        let mut tables = self.tables.lock();
        if until > tables.wake_suppressed_until {
            tables.wake_suppressed_until = until;
            info!(duration_ms, "wake suppression armed");
        }
    }

    /// The UI host reports that an intervention ended.
    ///
    /// This is the only path out of INTERVENTION_ACTIVE once the preserved
    /// flag is set (the surface may be destroyed long before the
    /// intervention is over).
    pub fn on_intervention_dismissed(&self, app: &str) {
        let handles = {
            let mut tables = self.tables.lock();
            let entry = tables.app(app);
            if entry.qt_state != QtState::InterventionActive && !entry.preserved_intervention {
                info!(app, state = entry.qt_state.as_str(), "intervention dismissal ignored");
                return;
            }
            info!(app, "intervention dismissed");
            entry.force_idle()
        };
        self.cancel_timers(handles);
    }

    /// Read-only view of an app's decision state, for host status queries
    /// and diagnostics.
    pub fn app_view(&self, app: &str) -> Option<crate::state::AppEntry> {
        self.tables.lock().apps.get(app).cloned()
    }

    /// Read-only view of the tracked surface, if one is live.
    pub fn surface_view(&self) -> Option<crate::state::SurfaceTracking> {
        self.tables.lock().surface.clone()
    }

    #[cfg(test)]
    pub(crate) fn tables(&self) -> parking_lot::MutexGuard<'_, Tables> {
        self.tables.lock()
    }
}
