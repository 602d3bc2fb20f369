// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync lifecycle events broadcast to listeners.
//!
//! One fan-out channel serves every listener interested in drain outcomes
//! (status badges, notification hooks, tests). Receivers that lag past the
//! channel capacity miss the oldest events, which is acceptable for
//! status-style notifications.

use prepsync_core::SyncReport;

/// Event emitted around each drain pass.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A drain pass has begun.
    Started,
    /// A drain pass finished with this summary.
    Completed(SyncReport),
}
