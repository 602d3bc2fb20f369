// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync client configuration.
//!
//! Hosts typically embed [`SyncConfig`] in their own config file; every field
//! except the store directory has a serde default so partial configs load.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::retry::BackoffPolicy;

/// Configuration for a [`SyncEngine`](crate::SyncEngine).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Directory holding the persisted queue and conflict records.
    pub store_dir: PathBuf,
    /// Attempts per item before it is parked as failed (default: 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Retry delay strategy (default: immediate, matching the queue's
    /// historical behavior).
    #[serde(default)]
    pub backoff: BackoffPolicy,
    /// Delay before the one best-effort drain performed at startup.
    #[serde(default = "default_startup_sync_delay_ms")]
    pub startup_sync_delay_ms: u64,
    /// Capacity of the completion event broadcast channel.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_max_retries() -> u32 {
    3
}

fn default_startup_sync_delay_ms() -> u64 {
    3_000
}

fn default_event_channel_capacity() -> usize {
    16
}

/// Default store location under the platform data directory.
fn default_store_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("prepsync")
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            store_dir: default_store_dir(),
            max_retries: default_max_retries(),
            backoff: BackoffPolicy::default(),
            startup_sync_delay_ms: default_startup_sync_delay_ms(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl SyncConfig {
    /// Default config with an explicit store directory.
    pub fn with_store_dir(dir: impl Into<PathBuf>) -> Self {
        SyncConfig { store_dir: dir.into(), ..SyncConfig::default() }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
