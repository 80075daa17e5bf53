// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delayed-callback scheduler with cancellation.
//!
//! Callbacks execute serially on one worker task, so callers can treat them
//! as single-threaded; a fired callback may schedule or cancel further
//! timers. A cancelled handle never fires: cancellation removes the stored
//! callback before any pending fire message can be processed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Opaque handle identifying one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

enum TimerCmd {
    Schedule { id: u64, delay: Duration, callback: TimerCallback },
    Cancel { id: u64 },
    Fire { id: u64 },
}

struct PendingTimer {
    callback: TimerCallback,
    cancel: CancellationToken,
}

/// Single-worker timer service.
///
/// `schedule` and `cancel` are non-blocking sends and are safe to call from
/// any thread, including from inside a firing callback.
pub struct TimerService {
    cmd_tx: mpsc::UnboundedSender<TimerCmd>,
    next_id: AtomicU64,
}

impl TimerService {
    /// Spawn the worker task. The service stops when `shutdown` is
    /// cancelled or every handle to it has been dropped.
    pub fn spawn(shutdown: CancellationToken) -> Arc<Self> {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let fire_tx = cmd_tx.clone();
        tokio::spawn(worker(cmd_rx, fire_tx, shutdown));
        Arc::new(Self { cmd_tx, next_id: AtomicU64::new(1) })
    }

    /// Schedule `callback` to run after `delay`.
    pub fn schedule(
        &self,
        delay: Duration,
        callback: impl FnOnce() + Send + 'static,
    ) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let _ = self.cmd_tx.send(TimerCmd::Schedule {
            id,
            delay,
            callback: Box::new(callback),
        });
        TimerHandle(id)
    }

    /// Cancel a scheduled timer. Best-effort: a timer whose callback has
    /// already started still runs to completion.
    pub fn cancel(&self, handle: TimerHandle) {
        let _ = self.cmd_tx.send(TimerCmd::Cancel { id: handle.0 });
    }
}

async fn worker(
    mut cmd_rx: mpsc::UnboundedReceiver<TimerCmd>,
    fire_tx: mpsc::UnboundedSender<TimerCmd>,
    shutdown: CancellationToken,
) {
    let mut pending: HashMap<u64, PendingTimer> = HashMap::new();
    loop {
        let cmd = tokio::select! {
            _ = shutdown.cancelled() => break,
            cmd = cmd_rx.recv() => match cmd {
                Some(cmd) => cmd,
                None => break,
            },
        };
        match cmd {
            TimerCmd::Schedule { id, delay, callback } => {
                let cancel = CancellationToken::new();
                pending.insert(id, PendingTimer { callback, cancel: cancel.clone() });
                let fire_tx = fire_tx.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(delay) => {
                            let _ = fire_tx.send(TimerCmd::Fire { id });
                        }
                    }
                });
            }
            TimerCmd::Cancel { id } => {
                if let Some(timer) = pending.remove(&id) {
                    timer.cancel.cancel();
                    trace!(id, "timer cancelled");
                }
            }
            TimerCmd::Fire { id } => {
                // Cancelled timers were removed above, so a late fire is a no-op.
                if let Some(timer) = pending.remove(&id) {
                    trace!(id, "timer fired");
                    (timer.callback)();
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
