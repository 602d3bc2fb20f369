// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Type-specific syncers: one remote write shape per payload variant.
//!
//! Every syncer performs exactly one remote interaction sequence. Mission
//! items go through a read-then-conditional-write with a timestamp conflict
//! check; the remaining categories write unconditionally.
//!
//! Errors are not classified: any failure is treated as transient by the
//! orchestrator and consumes one retry, even when the cause is permanent
//! (for example a payload the remote rejects on every attempt). This mirrors
//! the queue's historical retry semantics; changing it would change
//! observable behavior.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use prepsync_core::{StudyProgress, SyncItem, SyncPayload};

use crate::remote::{DocPath, RemoteError, RemoteResult, RemoteStore};

/// Outcome of one sync attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The remote write went through.
    Written,
    /// The remote document is strictly newer than the local item; nothing
    /// was written. Carries the remote snapshot for later resolution.
    Conflict { remote: Value },
}

/// Dispatches one item to the syncer for its payload variant.
pub async fn sync_item<R: RemoteStore>(
    remote: &mut R,
    item: &SyncItem,
) -> RemoteResult<SyncOutcome> {
    match &item.payload {
        SyncPayload::Mission { mission_id, progress } => {
            sync_mission(remote, item, mission_id, progress).await
        }
        SyncPayload::Progress(progress) => sync_study_session(remote, item, progress).await,
        SyncPayload::Analytics { event_type, event_data } => {
            sync_analytics(remote, item, event_type, event_data).await
        }
        SyncPayload::Preferences { preferences } => {
            sync_preferences(remote, item, preferences).await
        }
        SyncPayload::Session { data } => sync_session(remote, item, data).await,
    }
}

/// Conditional read-then-write for mission progress.
///
/// If the remote document exists and its `updated_at` is strictly later than
/// the item's timestamp, the write is withheld and the remote snapshot is
/// returned as a conflict. Equal timestamps write. A single scalar
/// comparison only: concurrent edits to disjoint fields still flag as
/// conflicting.
async fn sync_mission<R: RemoteStore>(
    remote: &mut R,
    item: &SyncItem,
    mission_id: &str,
    progress: &Value,
) -> RemoteResult<SyncOutcome> {
    let path = DocPath::journey(&item.user_id, mission_id);

    if let Some(existing) = remote.get(&path).await? {
        // Docs without a parseable updated_at never conflict.
        if let Some(remote_ts) = document_updated_at(&existing) {
            if remote_ts > item.timestamp {
                tracing::debug!(
                    id = %item.id,
                    local = %item.timestamp,
                    remote = %remote_ts,
                    "remote mission document is newer"
                );
                return Ok(SyncOutcome::Conflict { remote: existing });
            }
        }
    }

    let doc = json!({
        "mission_id": mission_id,
        "progress": progress,
        "updated_at": item.timestamp.to_rfc3339(),
    });
    remote.put(&path, doc, true).await?;
    Ok(SyncOutcome::Written)
}

async fn sync_study_session<R: RemoteStore>(
    remote: &mut R,
    item: &SyncItem,
    progress: &StudyProgress,
) -> RemoteResult<SyncOutcome> {
    let mut doc = serde_json::to_value(progress)
        .map_err(|e| RemoteError::InvalidDocument(e.to_string()))?;
    if let Some(map) = doc.as_object_mut() {
        map.insert("recorded_at".to_string(), json!(item.timestamp.to_rfc3339()));
    }

    remote.add(&DocPath::study_sessions(&item.user_id), doc).await?;
    Ok(SyncOutcome::Written)
}

async fn sync_analytics<R: RemoteStore>(
    remote: &mut R,
    item: &SyncItem,
    event_type: &str,
    event_data: &Value,
) -> RemoteResult<SyncOutcome> {
    let doc = json!({
        "event_type": event_type,
        "event_data": event_data,
        "occurred_at": item.timestamp.to_rfc3339(),
    });

    remote.add(&DocPath::analytics_events(&item.user_id), doc).await?;
    Ok(SyncOutcome::Written)
}

async fn sync_preferences<R: RemoteStore>(
    remote: &mut R,
    item: &SyncItem,
    preferences: &Value,
) -> RemoteResult<SyncOutcome> {
    let doc = json!({
        "preferences": preferences,
        "updated_at": item.timestamp.to_rfc3339(),
    });

    remote.put(&DocPath::user(&item.user_id), doc, true).await?;
    Ok(SyncOutcome::Written)
}

async fn sync_session<R: RemoteStore>(
    remote: &mut R,
    item: &SyncItem,
    data: &Value,
) -> RemoteResult<SyncOutcome> {
    let doc = json!({
        "data": data,
        "updated_at": item.timestamp.to_rfc3339(),
    });

    remote.put(&DocPath::session(&item.user_id, &item.id), doc, true).await?;
    Ok(SyncOutcome::Written)
}

/// Extracts the last-updated timestamp from a remote document.
fn document_updated_at(doc: &Value) -> Option<DateTime<Utc>> {
    doc.get("updated_at")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
#[path = "syncer_tests.rs"]
mod tests;
