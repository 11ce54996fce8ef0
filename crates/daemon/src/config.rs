// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration (`config.toml` in the state dir).

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Tunables with conservative defaults; absent file means all defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Per-attachment size cap in bytes
    pub attachment_max_bytes: u64,
    /// Total attachment store cap in bytes (0 = unbounded)
    pub attachment_total_cap: u64,
    /// Automatic repair attempts before escalating to a decision point
    pub repair_max_attempts: u32,
    /// Rotate the daemon log above this size
    pub log_max_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            attachment_max_bytes: 5 * 1024 * 1024,
            attachment_total_cap: 0,
            repair_max_attempts: 3,
            log_max_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load from the given path; a missing file yields defaults, a corrupt
    /// file warns and yields defaults rather than blocking startup.
    pub fn load(path: &Path) -> Self {
        if !path.is_file() {
            return Self::default();
        }
        match std::fs::read_to_string(path)
            .map_err(ConfigError::from)
            .and_then(|s| toml::from_str(&s).map_err(ConfigError::from))
        {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Invalid config, using defaults");
                Self::default()
            }
        }
    }
}
