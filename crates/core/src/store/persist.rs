// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-behind persistence worker shared by all stores.
//!
//! Stores enqueue `(document name, JSON value)` jobs; one worker serialises
//! them to `<dir>/<name>.json` with a tmp-then-rename write and a single
//! best-effort retry. With no state directory (tests, attach-style hosts)
//! everything stays in memory and jobs are dropped.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

struct PersistJob {
    name: &'static str,
    doc: serde_json::Value,
}

/// Handle used by stores to enqueue durable writes.
pub struct Persister {
    job_tx: Option<mpsc::UnboundedSender<PersistJob>>,
}

impl Persister {
    /// Spawn the write-behind worker. `None` = in-memory only.
    pub fn spawn(dir: Option<PathBuf>, shutdown: CancellationToken) -> Arc<Self> {
        let Some(dir) = dir else {
            return Arc::new(Self { job_tx: None });
        };
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        tokio::spawn(worker(dir, job_rx, shutdown));
        Arc::new(Self { job_tx: Some(job_tx) })
    }

    /// Enqueue one document write. Fire-and-forget.
    pub fn enqueue(&self, name: &'static str, doc: serde_json::Value) {
        if let Some(ref tx) = self.job_tx {
            let _ = tx.send(PersistJob { name, doc });
        }
    }

    /// Synchronous startup read of a previously persisted document.
    pub fn load<T: DeserializeOwned>(dir: Option<&Path>, name: &str) -> Option<T> {
        let path = dir?.join(format!("{name}.json"));
        let contents = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&contents).ok()
    }
}

async fn worker(
    dir: PathBuf,
    mut job_rx: mpsc::UnboundedReceiver<PersistJob>,
    shutdown: CancellationToken,
) {
    if let Err(e) = tokio::fs::create_dir_all(&dir).await {
        warn!(dir = %dir.display(), error = %e, "state dir unavailable, writes will fail");
    }
    loop {
        let job = tokio::select! {
            _ = shutdown.cancelled() => {
                // Drain whatever is already queued before stopping.
                while let Ok(job) = job_rx.try_recv() {
                    write_doc(&dir, &job).await;
                }
                break;
            }
            job = job_rx.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };
        write_doc(&dir, &job).await;
    }
}

async fn write_doc(dir: &Path, job: &PersistJob) {
    for attempt in 0..2u8 {
        match try_write(dir, job).await {
            Ok(()) => {
                debug!(doc = job.name, "persisted");
                return;
            }
            Err(e) => {
                warn!(doc = job.name, attempt, error = %e, "durable write failed");
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    }
}

async fn try_write(dir: &Path, job: &PersistJob) -> std::io::Result<()> {
    let bytes = serde_json::to_vec_pretty(&job.doc)?;
    let tmp = dir.join(format!("{}.json.tmp", job.name));
    let path = dir.join(format!("{}.json", job.name));
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, &path).await
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
