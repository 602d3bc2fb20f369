// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Conflict records and resolution decisions.
//!
//! When a mission write finds strictly newer remote state, the orchestrator
//! parks the item as `Conflict` and stores a [`ConflictRecord`] pairing the
//! local item with the remote snapshot it lost to. The caller later settles
//! each record with a [`ConflictResolution`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::item::SyncItem;

/// A detected divergence between a local pending mutation and newer remote
/// state for the same logical record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// The local item whose write was withheld.
    pub local: SyncItem,
    /// The remote document snapshot that won the timestamp comparison.
    pub remote: Value,
    pub detected_at: DateTime<Utc>,
}

impl ConflictRecord {
    pub fn new(local: SyncItem, remote: Value, detected_at: DateTime<Utc>) -> Self {
        ConflictRecord { local, remote, detected_at }
    }
}

/// How to settle one conflicting item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Resolution {
    /// Re-queue the local mutation; the retried write wins unless the remote
    /// moves again before the next drain (accepted race).
    KeepLocal,
    /// Discard the local mutation and accept the remote state. No write.
    KeepRemote,
    /// Replace the item's document with caller-merged data and re-queue.
    Merge { data: Value },
}

/// A caller-supplied decision applied to exactly one queued item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictResolution {
    pub item_id: String,
    #[serde(flatten)]
    pub decision: Resolution,
}

impl ConflictResolution {
    /// Creates a keep-local resolution.
    pub fn keep_local(item_id: impl Into<String>) -> Self {
        ConflictResolution { item_id: item_id.into(), decision: Resolution::KeepLocal }
    }

    /// Creates a keep-remote resolution.
    pub fn keep_remote(item_id: impl Into<String>) -> Self {
        ConflictResolution { item_id: item_id.into(), decision: Resolution::KeepRemote }
    }

    /// Creates a merge resolution carrying the merged document.
    pub fn merge(item_id: impl Into<String>, data: Value) -> Self {
        ConflictResolution { item_id: item_id.into(), decision: Resolution::Merge { data } }
    }
}

#[cfg(test)]
#[path = "conflict_tests.rs"]
mod tests;
