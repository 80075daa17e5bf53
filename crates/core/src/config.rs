// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;

/// Intervention decision core for monitored app launches.
#[derive(Debug, Parser)]
#[command(name = "breakwater", version, about)]
pub struct Config {
    /// Directory for durable store documents. Omit for in-memory only.
    #[arg(long, env = "BREAKWATER_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Package identifier of the application hosting this core.
    #[arg(long, env = "BREAKWATER_SELF_PACKAGE", default_value = "app.breakwater.host")]
    pub self_package: String,

    /// System UI / launcher packages, never eligible for intervention.
    #[arg(
        long,
        env = "BREAKWATER_SYSTEM_PACKAGES",
        value_delimiter = ',',
        default_value = "com.android.systemui,com.android.launcher3"
    )]
    pub system_packages: Vec<String>,

    /// Initial monitored app set (overridden by a restored store document).
    #[arg(long, env = "BREAKWATER_MONITORED", value_delimiter = ',')]
    pub monitored: Vec<String>,

    /// Quick tasks allowed per quota window.
    #[arg(long, env = "BREAKWATER_MAX_QUOTA", default_value = "3")]
    pub max_quota: u32,

    /// Log format (json or text).
    #[arg(long, env = "BREAKWATER_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "BREAKWATER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_quota == 0 {
            anyhow::bail!("--max-quota must be at least 1");
        }
        if self.self_package.is_empty() {
            anyhow::bail!("--self-package must not be empty");
        }
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        if self.monitored.iter().any(|app| app.is_empty()) {
            anyhow::bail!("--monitored entries must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
