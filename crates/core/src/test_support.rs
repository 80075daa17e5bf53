// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: a fully wired core with a captured surface
//! channel, virtual-time clock, and in-memory stores.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::coordinator::Coordinator;
use crate::event::{SurfaceIntent, WakeReason};
use crate::foreground::ForegroundTracker;
use crate::store::{IntentionStore, MonitoredAppsStore, Persister, QuotaStore, ReturnContextStore};
use crate::surface::SurfaceBridge;
use crate::timer::TimerService;

pub const SELF_PKG: &str = "app.breakwater.host";
pub const LAUNCHER: &str = "com.android.launcher3";
pub const SHADE: &str = "com.android.systemui";
pub const FEED: &str = "com.example.feed";
pub const OTHER: &str = "com.other.app";

/// Builder for a test core. Defaults: quota 3, `FEED` monitored, clock
/// origin 0 so timestamps match scenario literals.
pub struct TestCoreBuilder {
    quota_max: u32,
    monitored: Vec<String>,
}

impl Default for TestCoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestCoreBuilder {
    pub fn new() -> Self {
        Self { quota_max: 3, monitored: vec![FEED.to_owned()] }
    }

    pub fn quota_max(mut self, quota_max: u32) -> Self {
        self.quota_max = quota_max;
        self
    }

    pub fn monitored(mut self, apps: impl IntoIterator<Item = String>) -> Self {
        self.monitored = apps.into_iter().collect();
        self
    }

    pub fn build(self) -> TestCore {
        let shutdown = CancellationToken::new();
        let clock = Clock::with_origin(0);
        let timers = TimerService::spawn(shutdown.clone());
        let persist = Persister::spawn(None, shutdown.clone());
        let quota = Arc::new(QuotaStore::restore(Arc::clone(&persist), None, self.quota_max, 0));
        let monitored =
            Arc::new(MonitoredAppsStore::restore(Arc::clone(&persist), None, self.monitored));
        let intentions = Arc::new(IntentionStore::restore(Arc::clone(&persist), None));
        let return_context = Arc::new(ReturnContextStore::restore(Arc::clone(&persist), None));
        let foreground = Arc::new(ForegroundTracker::new(
            SELF_PKG,
            [LAUNCHER.to_owned(), SHADE.to_owned()],
        ));
        let (bridge, intents) = SurfaceBridge::new();
        let coordinator = Coordinator::new(
            clock.clone(),
            timers,
            bridge,
            Arc::clone(&quota),
            Arc::clone(&monitored),
            Arc::clone(&intentions),
            Arc::clone(&foreground),
        );
        TestCore {
            coordinator,
            foreground,
            quota,
            monitored,
            intentions,
            return_context,
            clock,
            intents,
            shutdown,
            next_instance: 1,
        }
    }
}

/// A wired core plus the receiving end of the surface bridge.
pub struct TestCore {
    pub coordinator: Arc<Coordinator>,
    pub foreground: Arc<ForegroundTracker>,
    pub quota: Arc<QuotaStore>,
    pub monitored: Arc<MonitoredAppsStore>,
    pub intentions: Arc<IntentionStore>,
    pub return_context: Arc<ReturnContextStore>,
    pub clock: Clock,
    pub intents: mpsc::UnboundedReceiver<SurfaceIntent>,
    pub shutdown: CancellationToken,
    next_instance: u64,
}

impl TestCore {
    /// Let spawned workers (timer service, waiters) run.
    pub async fn settle(&self) {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    /// Drive one foreground event through tracker and coordinator.
    pub fn enter(&self, package: &str, at_ms: u64) {
        self.coordinator.on_foreground_changed(package, at_ms);
    }

    /// Pop the next emitted intent, failing the test if none arrived.
    pub fn expect_intent(&mut self) -> SurfaceIntent {
        // OK to panic in test-only code: a missing emit is the failure.
        #[allow(clippy::expect_used)]
        let intent = self.intents.try_recv().expect("expected a surface intent");
        intent
    }

    /// Pop the next intent and assert its wake reason and app.
    pub fn expect_wake(&mut self, wake_reason: WakeReason, app: &str) -> SurfaceIntent {
        let intent = self.expect_intent();
        assert_eq!(intent.wake_reason, wake_reason, "wake reason for {app}");
        assert_eq!(intent.app, app);
        intent
    }

    /// Assert that no intent is pending.
    pub fn expect_no_intent(&mut self) {
        if let Ok(intent) = self.intents.try_recv() {
            // OK to panic in test-only code.
            #[allow(clippy::panic)]
            {
                panic!("unexpected surface intent: {intent:?}");
            }
        }
    }

    /// Simulate the host opening the surface for an intent it received.
    pub fn open_surface(&mut self, intent: &SurfaceIntent) -> u64 {
        let instance = self.next_instance;
        self.next_instance += 1;
        self.coordinator.on_surface_opened(
            &intent.app,
            intent.session_id,
            intent.wake_reason,
            instance,
        );
        instance
    }

    /// Simulate the host destroying a surface it previously opened.
    pub fn destroy_surface(&self, intent: &SurfaceIntent, instance: u64) {
        self.coordinator.on_surface_destroyed(
            Some(&intent.app),
            Some(intent.session_id),
            Some(intent.wake_reason),
            instance,
        );
    }
}

/// Advance virtual time and let timers fire.
pub async fn advance_ms(ms: u64) {
    tokio::time::advance(std::time::Duration::from_millis(ms)).await;
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
