// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync items: queued, not-yet-confirmed mutations destined for the remote
//! store.
//!
//! Every local mutation the app wants mirrored remotely is captured as a
//! [`SyncItem`] carrying a [`SyncPayload`], a closed sum type over the five
//! mutation categories. Items are:
//!
//! - Serializable: persisted to the local queue as JSON
//! - Ordered: processed strictly in enqueue order
//! - Bounded: retried up to a cap, then parked as `Failed`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Lifecycle state of a queued sync item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Waiting for a sync attempt.
    Pending,
    /// Successfully written to the remote store. Terminal.
    Synced,
    /// Retry budget exhausted. Terminal unless manually reset.
    Failed,
    /// A newer remote version was found. Awaiting a resolution decision.
    Conflict,
}

impl SyncStatus {
    /// Returns the snake_case name used in persisted JSON and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::Failed => "failed",
            SyncStatus::Conflict => "conflict",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The mutation category of a payload, without its data.
///
/// Used for id generation, status reporting, and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    Mission,
    Progress,
    Analytics,
    Preferences,
    Session,
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Mission => "mission",
            PayloadKind::Progress => "progress",
            PayloadKind::Analytics => "analytics",
            PayloadKind::Preferences => "preferences",
            PayloadKind::Session => "session",
        }
    }
}

impl std::fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded study session, the `progress` payload shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyProgress {
    pub session_id: String,
    pub subject: String,
    /// Minutes spent in the session.
    pub time_spent_minutes: u32,
    pub questions_answered: u32,
    /// Fraction of questions answered correctly, in `0.0..=1.0`.
    pub accuracy: f64,
}

/// Payload describing the mutation a sync item carries.
///
/// A closed tagged union: each variant implies a distinct remote write shape,
/// so no runtime narrowing of an opaque blob is ever needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncPayload {
    /// Mission (journey) progress, merge-written after a conflict check.
    Mission {
        mission_id: String,
        /// Progress document for `users/{uid}/journeys/{mission_id}`.
        progress: Value,
    },

    /// A completed study session, appended to the user's session log.
    Progress(StudyProgress),

    /// An analytics event, appended to the user's event log.
    Analytics { event_type: String, event_data: Value },

    /// User preferences, merge-written onto the user document.
    Preferences { preferences: Value },

    /// Generic session snapshot, merge-written under the item's own id.
    Session { data: Value },
}

impl SyncPayload {
    /// Creates a Mission payload.
    pub fn mission(mission_id: impl Into<String>, progress: Value) -> Self {
        SyncPayload::Mission { mission_id: mission_id.into(), progress }
    }

    /// Creates a Progress payload.
    pub fn progress(progress: StudyProgress) -> Self {
        SyncPayload::Progress(progress)
    }

    /// Creates an Analytics payload.
    pub fn analytics(event_type: impl Into<String>, event_data: Value) -> Self {
        SyncPayload::Analytics { event_type: event_type.into(), event_data }
    }

    /// Creates a Preferences payload.
    pub fn preferences(preferences: Value) -> Self {
        SyncPayload::Preferences { preferences }
    }

    /// Creates a Session payload.
    pub fn session(data: Value) -> Self {
        SyncPayload::Session { data }
    }

    /// Returns the mutation category of this payload.
    pub fn kind(&self) -> PayloadKind {
        match self {
            SyncPayload::Mission { .. } => PayloadKind::Mission,
            SyncPayload::Progress(_) => PayloadKind::Progress,
            SyncPayload::Analytics { .. } => PayloadKind::Analytics,
            SyncPayload::Preferences { .. } => PayloadKind::Preferences,
            SyncPayload::Session { .. } => PayloadKind::Session,
        }
    }

    /// Replaces this payload's document with caller-supplied merged data.
    ///
    /// Used when a conflict is resolved with a merge decision. The variant is
    /// preserved; only its data changes. For `progress` items the merged data
    /// must deserialize into [`StudyProgress`].
    pub fn apply_merged_data(&mut self, data: Value) -> Result<()> {
        match self {
            SyncPayload::Mission { progress, .. } => {
                *progress = data;
            }
            SyncPayload::Progress(session) => {
                *session = serde_json::from_value(data).map_err(|e| Error::InvalidMergeData {
                    kind: PayloadKind::Progress.as_str(),
                    reason: e.to_string(),
                })?;
            }
            SyncPayload::Analytics { event_data, .. } => {
                *event_data = data;
            }
            SyncPayload::Preferences { preferences } => {
                *preferences = data;
            }
            SyncPayload::Session { data: session_data } => {
                *session_data = data;
            }
        }
        Ok(())
    }
}

/// One pending mutation in the sync queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncItem {
    /// Opaque unique id, generated at enqueue time.
    pub id: String,
    /// Owning principal.
    pub user_id: String,
    /// The mutation being synced.
    #[serde(flatten)]
    pub payload: SyncPayload,
    /// Logical creation time; the conflict comparand.
    pub timestamp: DateTime<Utc>,
    pub status: SyncStatus,
    pub retry_count: u32,
    /// Set after each failed attempt.
    pub last_attempt: Option<DateTime<Utc>>,
}

impl SyncItem {
    /// Creates a fresh pending item.
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        payload: SyncPayload,
        timestamp: DateTime<Utc>,
    ) -> Self {
        SyncItem {
            id: id.into(),
            user_id: user_id.into(),
            payload,
            timestamp,
            status: SyncStatus::Pending,
            retry_count: 0,
            last_attempt: None,
        }
    }

    /// Marks the item as successfully synced.
    pub fn mark_synced(&mut self) {
        self.status = SyncStatus::Synced;
    }

    /// Marks the item as conflicting with newer remote state.
    ///
    /// Conflicts bypass the retry counter entirely.
    pub fn mark_conflict(&mut self) {
        self.status = SyncStatus::Conflict;
    }

    /// Records a failed sync attempt.
    ///
    /// Increments the retry count and stamps `last_attempt`. Once the count
    /// reaches `max_retries` the item transitions to `Failed`; otherwise it
    /// stays `Pending`. Returns true if the retry budget is now exhausted.
    ///
    /// This is the single place the `retry_count >= max_retries implies
    /// Failed` invariant is maintained.
    pub fn record_failure(&mut self, now: DateTime<Utc>, max_retries: u32) -> bool {
        self.retry_count += 1;
        self.last_attempt = Some(now);
        if self.retry_count >= max_retries {
            self.status = SyncStatus::Failed;
            true
        } else {
            self.status = SyncStatus::Pending;
            false
        }
    }

    /// Resets the item for another attempt, re-stamping its logical time.
    ///
    /// Used when a conflict is resolved in favor of the local data: the fresh
    /// timestamp lets the retried write win the next comparison unless the
    /// remote has moved again in the meantime.
    pub fn reset_for_retry(&mut self, now: DateTime<Utc>) {
        self.status = SyncStatus::Pending;
        self.timestamp = now;
    }

    /// Replaces the payload's document with merged data and re-queues.
    pub fn apply_merged_data(&mut self, data: Value) -> Result<()> {
        self.payload.apply_merged_data(data)?;
        self.status = SyncStatus::Pending;
        Ok(())
    }
}

#[cfg(test)]
#[path = "item_tests.rs"]
mod tests;
