// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync orchestrator.
//!
//! [`SyncEngine`] owns the queue store, the remote store, and the drain
//! state machine. It is an explicitly constructed instance (built once at
//! application startup and shared behind an `Arc`) rather than a
//! process-wide singleton, so tests get a fresh engine each and no hidden
//! global state exists.
//!
//! Per-item state machine:
//!
//! ```text
//!            ┌────────── success ──────────► Synced (terminal)
//!            │
//! Pending ───┼── failure, retries left ────► Pending (retry_count + 1)
//!            │
//!            ├── failure, budget spent ────► Failed (terminal unless reset)
//!            │
//!            └── newer remote state ───────► Conflict (awaits resolution)
//! ```
//!
//! A drain processes eligible items strictly in queue order and awaits each
//! syncer sequentially; no two remote writes from the same drain run
//! concurrently. There is no cancellation: once a drain starts it runs to
//! completion.

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};

use prepsync_core::{
    id, ClockSource, ConflictRecord, ConflictResolution, Error, QueueStatus, Resolution, Result,
    StudyProgress, SyncItem, SyncPayload, SyncReport, SyncStatus, SystemClock,
};

use crate::config::SyncConfig;
use crate::events::SyncEvent;
use crate::remote::RemoteStore;
use crate::store::QueueStore;
use crate::syncer::{self, SyncOutcome};

/// Orchestrator for the offline sync queue.
pub struct SyncEngine<R: RemoteStore> {
    config: SyncConfig,
    clock: Arc<dyn ClockSource>,
    store: Mutex<QueueStore>,
    remote: Mutex<R>,
    /// Rejects concurrent drains. One engine, one drain at a time.
    syncing: AtomicBool,
    online: AtomicBool,
    events: broadcast::Sender<SyncEvent>,
}

impl<R: RemoteStore> SyncEngine<R> {
    /// Creates an engine with the system clock, opening its queue store.
    pub fn new(config: SyncConfig, remote: R) -> Result<Self> {
        Self::with_clock(config, remote, Arc::new(SystemClock))
    }

    /// Creates an engine with a custom clock source (for testing).
    pub fn with_clock(
        config: SyncConfig,
        remote: R,
        clock: Arc<dyn ClockSource>,
    ) -> Result<Self> {
        let store = QueueStore::open(&config.store_dir)?;
        // broadcast::channel rejects a zero capacity.
        let (events, _) = broadcast::channel(config.event_channel_capacity.max(1));

        Ok(SyncEngine {
            config,
            clock,
            store: Mutex::new(store),
            remote: Mutex::new(remote),
            syncing: AtomicBool::new(false),
            online: AtomicBool::new(true),
            events,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Subscribes to drain lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn is_online(&self) -> bool {
        self.online.load(AtomicOrdering::SeqCst)
    }

    /// Queues mission progress for `users/{uid}/journeys/{mission_id}`.
    pub async fn queue_mission_progress(
        &self,
        user_id: &str,
        mission_id: &str,
        progress: Value,
    ) -> String {
        self.enqueue(user_id, SyncPayload::mission(mission_id, progress)).await
    }

    /// Queues a completed study session.
    pub async fn queue_study_session(&self, user_id: &str, progress: StudyProgress) -> String {
        self.enqueue(user_id, SyncPayload::progress(progress)).await
    }

    /// Queues an analytics event.
    pub async fn queue_analytics_event(
        &self,
        user_id: &str,
        event_type: &str,
        event_data: Value,
    ) -> String {
        self.enqueue(user_id, SyncPayload::analytics(event_type, event_data)).await
    }

    /// Queues a user preferences update.
    pub async fn queue_user_preferences(&self, user_id: &str, preferences: Value) -> String {
        self.enqueue(user_id, SyncPayload::preferences(preferences)).await
    }

    /// Queues a generic session snapshot.
    pub async fn queue_session_snapshot(&self, user_id: &str, data: Value) -> String {
        self.enqueue(user_id, SyncPayload::session(data)).await
    }

    /// Shapes a payload into a pending item and appends it to the queue.
    ///
    /// Returns the generated item id.
    async fn enqueue(&self, user_id: &str, payload: SyncPayload) -> String {
        let now = self.clock.now();
        let mut store = self.store.lock().await;

        let id = id::generate_unique_id(payload.kind(), user_id, &now, |candidate| {
            store.items().iter().any(|item| item.id == candidate)
        });
        tracing::debug!(id = %id, kind = %payload.kind(), "queueing sync item");

        store.enqueue(SyncItem::new(id.clone(), user_id, payload, now));
        id
    }

    /// Drains the queue once.
    ///
    /// Rejected immediately with `success: false` if a drain is already in
    /// progress, without touching the queue. Otherwise processes every
    /// eligible item in queue order, persists the updated queue, broadcasts
    /// completion, and returns the summary.
    pub async fn start_sync(&self) -> SyncReport {
        if self
            .syncing
            .compare_exchange(false, true, AtomicOrdering::SeqCst, AtomicOrdering::SeqCst)
            .is_err()
        {
            tracing::debug!("rejecting concurrent sync drain");
            return SyncReport::rejected("sync already in progress");
        }

        let _ = self.events.send(SyncEvent::Started);
        let report = self.drain().await;
        self.syncing.store(false, AtomicOrdering::SeqCst);
        let _ = self.events.send(SyncEvent::Completed(report.clone()));
        report
    }

    /// Drains the queue now, unless connectivity is unavailable.
    pub async fn force_sync_now(&self) -> SyncReport {
        if !self.is_online() {
            tracing::debug!("force sync requested while offline");
            return SyncReport::rejected("device is offline");
        }
        self.start_sync().await
    }

    async fn drain(&self) -> SyncReport {
        let mut report = SyncReport::empty();
        let mut store = self.store.lock().await;

        // Persistence failures don't fail the drain; the in-memory queue is
        // authoritative for this session.
        if let Err(e) = store.reload() {
            tracing::warn!(error = %e, "failed to reload persisted queue; using in-memory state");
        }

        let now = self.clock.now();
        let eligible: Vec<usize> = store
            .items()
            .iter()
            .enumerate()
            .filter(|(_, item)| self.is_eligible(item, now))
            .map(|(idx, _)| idx)
            .collect();

        if eligible.is_empty() {
            tracing::debug!("sync drain found no eligible items");
            return report;
        }

        tracing::info!(items = eligible.len(), "sync drain started");
        let mut remote = self.remote.lock().await;

        for idx in eligible {
            let item = store.items()[idx].clone();
            match syncer::sync_item(&mut *remote, &item).await {
                Ok(SyncOutcome::Written) => {
                    store.items_mut()[idx].mark_synced();
                    report.synced += 1;
                }
                Ok(SyncOutcome::Conflict { remote: snapshot }) => {
                    store.items_mut()[idx].mark_conflict();
                    let record =
                        ConflictRecord::new(store.items()[idx].clone(), snapshot, self.clock.now());
                    store.push_conflict(record);
                    report.conflicts += 1;
                    tracing::warn!(id = %item.id, "remote state is newer; item parked as conflict");
                }
                Err(e) => {
                    let exhausted = store.items_mut()[idx]
                        .record_failure(self.clock.now(), self.config.max_retries);
                    report.failed += 1;
                    report.errors.push(format!("{} ({}): {}", item.id, item.payload.kind(), e));
                    if exhausted {
                        tracing::warn!(
                            id = %item.id,
                            retries = self.config.max_retries,
                            "retry budget exhausted; item parked as failed"
                        );
                    } else {
                        tracing::debug!(id = %item.id, error = %e, "sync attempt failed; will retry");
                    }
                }
            }
        }
        drop(remote);

        if let Err(e) = store.persist() {
            tracing::warn!(error = %e, "failed to persist queue after drain");
        }

        tracing::info!(
            synced = report.synced,
            conflicts = report.conflicts,
            failed = report.failed,
            "sync drain complete"
        );
        report
    }

    /// Whether a drain should attempt this item now.
    ///
    /// Pending items are eligible, as are failed items whose retry budget
    /// was manually restored. The backoff policy then gates items with a
    /// prior failed attempt.
    fn is_eligible(&self, item: &SyncItem, now: DateTime<Utc>) -> bool {
        let retryable = match item.status {
            SyncStatus::Pending => true,
            SyncStatus::Failed => item.retry_count < self.config.max_retries,
            SyncStatus::Synced | SyncStatus::Conflict => false,
        };
        if !retryable {
            return false;
        }

        match item.last_attempt {
            None => true,
            Some(last) => now >= last + self.config.backoff.delay_for(item.retry_count),
        }
    }

    /// Applies caller decisions to conflicting items.
    ///
    /// Returns the number of resolutions applied. Fails with
    /// [`Error::ItemNotFound`] if a resolution names an unknown item;
    /// resolutions before the unknown one remain applied.
    pub async fn resolve_conflicts(&self, resolutions: &[ConflictResolution]) -> Result<usize> {
        let mut store = self.store.lock().await;
        let mut applied = 0;

        for resolution in resolutions {
            let now = self.clock.now();
            {
                let item = store
                    .find_mut(&resolution.item_id)
                    .ok_or_else(|| Error::ItemNotFound(resolution.item_id.clone()))?;

                match &resolution.decision {
                    Resolution::KeepLocal => item.reset_for_retry(now),
                    Resolution::KeepRemote => item.mark_synced(),
                    Resolution::Merge { data } => {
                        item.apply_merged_data(data.clone())?;
                        // Re-stamp so the retried write wins the next
                        // timestamp comparison, as with KeepLocal.
                        item.reset_for_retry(now);
                    }
                }
            }
            store.remove_conflict(&resolution.item_id);
            applied += 1;
            tracing::debug!(id = %resolution.item_id, "conflict resolved");
        }

        if let Err(e) = store.persist() {
            tracing::warn!(error = %e, "failed to persist queue after conflict resolution");
        }
        Ok(applied)
    }

    /// Whole-queue counts by status.
    pub async fn status(&self) -> QueueStatus {
        self.store.lock().await.status()
    }

    /// Snapshot of every queued item, for caller inspection of failed or
    /// conflicting mutations.
    pub async fn queue_items(&self) -> Vec<SyncItem> {
        self.store.lock().await.items().to_vec()
    }

    /// Conflict records awaiting resolution.
    pub async fn conflicts(&self) -> Vec<ConflictRecord> {
        self.store.lock().await.conflicts().to_vec()
    }

    /// Explicitly empties the queue and conflict records.
    pub async fn clear_queue(&self) {
        let mut store = self.store.lock().await;
        if let Err(e) = store.clear() {
            tracing::warn!(error = %e, "failed to clear persisted queue");
        }
    }
}

impl<R: RemoteStore + 'static> SyncEngine<R> {
    /// Wires a connectivity change into the engine.
    ///
    /// Going from offline to online schedules a background drain; going
    /// offline suspends nothing in flight (drains are never cancelled) but
    /// makes `force_sync_now` short-circuit.
    pub fn set_online(self: &Arc<Self>, online: bool) {
        let was_online = self.online.swap(online, AtomicOrdering::SeqCst);

        if online && !was_online {
            tracing::info!("connectivity restored; scheduling sync drain");
            let engine = Arc::clone(self);
            tokio::spawn(async move {
                let _ = engine.start_sync().await;
            });
        } else if !online && was_online {
            tracing::info!("connectivity lost; sync suspended");
        }
    }

    /// Performs one best-effort drain shortly after startup.
    ///
    /// Runs only if the queue is non-empty and connectivity is present when
    /// the startup delay elapses.
    pub fn initialize(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(StdDuration::from_millis(engine.config.startup_sync_delay_ms))
                .await;

            if !engine.is_online() {
                return;
            }
            if engine.store.lock().await.is_empty() {
                return;
            }

            let report = engine.start_sync().await;
            tracing::info!(
                synced = report.synced,
                conflicts = report.conflicts,
                failed = report.failed,
                "startup sync complete"
            );
        });
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
