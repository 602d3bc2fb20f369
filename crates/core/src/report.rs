// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Drain summaries and queue status counts.

use serde::{Deserialize, Serialize};

use crate::item::{SyncItem, SyncStatus};

/// Summary of one drain pass over the queue.
///
/// `failed` counts items whose attempt failed during this drain, whether or
/// not the retry budget ran out. `success` is false only when the drain was
/// rejected outright (already in progress, or offline).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub success: bool,
    pub synced: usize,
    pub conflicts: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl SyncReport {
    /// An empty successful report, the result of draining an empty queue.
    pub fn empty() -> Self {
        SyncReport { success: true, ..SyncReport::default() }
    }

    /// A rejected report: nothing was processed, with one explanatory error.
    pub fn rejected(reason: impl Into<String>) -> Self {
        SyncReport { success: false, errors: vec![reason.into()], ..SyncReport::default() }
    }

    /// Total number of items this drain attempted.
    pub fn processed(&self) -> usize {
        self.synced + self.conflicts + self.failed
    }
}

/// Whole-queue counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub pending: usize,
    pub synced: usize,
    pub conflicts: usize,
    pub failed: usize,
}

impl QueueStatus {
    /// Tallies the items of a queue.
    pub fn from_items(items: &[SyncItem]) -> Self {
        let mut status = QueueStatus::default();
        for item in items {
            match item.status {
                SyncStatus::Pending => status.pending += 1,
                SyncStatus::Synced => status.synced += 1,
                SyncStatus::Conflict => status.conflicts += 1,
                SyncStatus::Failed => status.failed += 1,
            }
        }
        status
    }

    /// Total items across all statuses.
    pub fn total(&self) -> usize {
        self.pending + self.synced + self.conflicts + self.failed
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
