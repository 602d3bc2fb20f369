// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// All possible errors that can occur in the prepsync libraries.
///
/// Caller-facing errors carry hints for common mistakes. Failures inside a
/// sync drain never surface as `Error`; they land as strings in the drain
/// report instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("sync item not found: {0}\n  hint: the item may already have been cleared from the queue")]
    ItemNotFound(String),

    #[error("cannot merge resolution data into a '{kind}' item: {reason}")]
    InvalidMergeData { kind: &'static str, reason: String },

    #[error("sync store at {0} is locked by another process\n  hint: only one prepsync instance may own a store directory")]
    StoreLocked(String),

    #[error("corrupted data in sync store: {0}")]
    CorruptedData(String),

    #[error("remote store error: {0}")]
    Remote(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for prepsync operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
