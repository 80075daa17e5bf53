// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end binary smoke tests.
//!
//! Spawns the real `breakwater` binary and drives it over its JSONL
//! stdin/stdout feed.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// Resolve the path to the compiled `breakwater` binary.
pub fn breakwater_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("breakwater")
}

/// A running breakwater process with line-oriented stdin/stdout access.
pub struct Feed {
    child: Child,
    stdin: ChildStdin,
    stdout: tokio::io::Lines<BufReader<ChildStdout>>,
}

impl Feed {
    /// Spawn the binary with the given monitored apps and state dir.
    pub fn spawn(monitored: &str, state_dir: Option<&Path>) -> anyhow::Result<Self> {
        let mut command = Command::new(breakwater_binary());
        command
            .arg("--monitored")
            .arg(monitored)
            .arg("--log-level")
            .arg("warn")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = state_dir {
            command.arg("--state-dir").arg(dir);
        }
        let mut child = command.spawn()?;
        let stdin = child.stdin.take().ok_or_else(|| anyhow::anyhow!("no stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| anyhow::anyhow!("no stdout"))?;
        Ok(Self { child, stdin, stdout: BufReader::new(stdout).lines() })
    }

    /// Send one JSON line.
    pub async fn send(&mut self, value: serde_json::Value) -> anyhow::Result<()> {
        let mut line = value.to_string();
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Read the next JSON line, with a timeout.
    pub async fn recv(&mut self) -> anyhow::Result<serde_json::Value> {
        let line = tokio::time::timeout(Duration::from_secs(10), self.stdout.next_line())
            .await
            .map_err(|_| anyhow::anyhow!("timed out waiting for output"))??
            .ok_or_else(|| anyhow::anyhow!("stdout closed"))?;
        Ok(serde_json::from_str(&line)?)
    }

    /// Close stdin and wait for a clean exit.
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        drop(self.stdin);
        let status = tokio::time::timeout(Duration::from_secs(10), self.child.wait())
            .await
            .map_err(|_| anyhow::anyhow!("timed out waiting for exit"))??;
        if !status.success() {
            anyhow::bail!("binary exited with {status}");
        }
        Ok(())
    }
}
