// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level wiring — shared by `main` and the end-to-end tests.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::clock::Clock;
use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::event::SurfaceIntent;
use crate::foreground::ForegroundTracker;
use crate::store::{IntentionStore, MonitoredAppsStore, Persister, QuotaStore, ReturnContextStore};
use crate::surface::SurfaceBridge;
use crate::timer::TimerService;

/// A fully wired core: coordinator, tracker, stores, and the receiving end
/// of the surface bridge.
pub struct Core {
    pub coordinator: Arc<Coordinator>,
    pub foreground: Arc<ForegroundTracker>,
    pub quota: Arc<QuotaStore>,
    pub monitored: Arc<MonitoredAppsStore>,
    pub intentions: Arc<IntentionStore>,
    pub return_context: Arc<ReturnContextStore>,
    pub clock: Clock,
    /// `Option` because the feed loop takes ownership of the receiver.
    pub intents: Option<mpsc::UnboundedReceiver<SurfaceIntent>>,
    pub shutdown: CancellationToken,
}

/// Restore the stores and build the coordinator.
pub fn prepare(config: &Config) -> Core {
    let shutdown = CancellationToken::new();
    let clock = Clock::new();
    let now = clock.now_ms();
    let dir = config.state_dir.as_deref();

    let timers = TimerService::spawn(shutdown.clone());
    let persist = Persister::spawn(config.state_dir.clone(), shutdown.clone());
    let quota = Arc::new(QuotaStore::restore(Arc::clone(&persist), dir, config.max_quota, now));
    let monitored = Arc::new(MonitoredAppsStore::restore(
        Arc::clone(&persist),
        dir,
        config.monitored.iter().cloned(),
    ));
    let intentions = Arc::new(IntentionStore::restore(Arc::clone(&persist), dir));
    let return_context = Arc::new(ReturnContextStore::restore(Arc::clone(&persist), dir));
    let foreground = Arc::new(ForegroundTracker::new(
        config.self_package.clone(),
        config.system_packages.iter().cloned(),
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

    info!(
        monitored = monitored.snapshot().len(),
        quota = quota.snapshot().remaining,
        durable = dir.is_some(),
        "core prepared"
    );

    Core {
        coordinator,
        foreground,
        quota,
        monitored,
        intentions,
        return_context,
        clock,
        intents: Some(intents),
        shutdown,
    }
}
