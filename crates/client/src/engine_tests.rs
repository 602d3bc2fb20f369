// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the sync orchestrator.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration as StdDuration;

use super::*;
use crate::remote::DocPath;
use crate::retry::BackoffPolicy;
use crate::test_helpers::{study_progress, ts, ManualClock, MockRemote, RecordedWrite};
use serde_json::json;
use tempfile::{tempdir, TempDir};

fn make_config(dir: &TempDir) -> SyncConfig {
    SyncConfig::with_store_dir(dir.path().join("store"))
}

fn make_engine(dir: &TempDir, remote: MockRemote) -> SyncEngine<MockRemote> {
    SyncEngine::new(make_config(dir), remote).unwrap()
}

fn make_engine_with_clock(
    dir: &TempDir,
    remote: MockRemote,
    clock: Arc<ManualClock>,
) -> SyncEngine<MockRemote> {
    SyncEngine::with_clock(make_config(dir), remote, clock).unwrap()
}

/// Reads the persisted queue file directly, bypassing the engine's lock.
fn persisted_items(dir: &TempDir) -> Vec<SyncItem> {
    let raw = std::fs::read_to_string(dir.path().join("store").join("sync_queue.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[tokio::test]
async fn test_drain_empty_queue_returns_zeroed_report() {
    let dir = tempdir().unwrap();
    let engine = make_engine(&dir, MockRemote::new());

    let report = engine.start_sync().await;

    assert!(report.success);
    assert_eq!(report.synced, 0);
    assert_eq!(report.conflicts, 0);
    assert_eq!(report.failed, 0);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn test_successful_study_session_drain() {
    let dir = tempdir().unwrap();
    let remote = MockRemote::new();
    let engine = make_engine(&dir, remote.clone());

    engine.queue_study_session("u1", study_progress()).await;
    let report = engine.start_sync().await;

    assert!(report.success);
    assert_eq!(report.synced, 1);
    assert_eq!(report.conflicts, 0);
    assert_eq!(report.failed, 0);

    let status = engine.status().await;
    assert_eq!(status.synced, 1);
    assert_eq!(status.pending, 0);

    assert!(matches!(
        &remote.writes()[0],
        RecordedWrite::Add { collection, .. } if collection == "users/u1/study_sessions"
    ));
}

#[tokio::test]
async fn test_failure_exhausts_retries_after_three_drains() {
    let dir = tempdir().unwrap();
    let remote = MockRemote::new();
    remote.set_fail(true);
    let engine = make_engine(&dir, remote.clone());

    engine.queue_mission_progress("u1", "m1", json!({"percent": 10})).await;

    for _ in 0..3 {
        let report = engine.start_sync().await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors.len(), 1);
    }

    let items = persisted_items(&dir);
    assert_eq!(items[0].status, SyncStatus::Failed);
    assert_eq!(items[0].retry_count, 3);
    assert_eq!(engine.status().await.failed, 1);
}

#[tokio::test]
async fn test_exhausted_item_is_skipped_by_later_drains() {
    let dir = tempdir().unwrap();
    let remote = MockRemote::new();
    remote.set_fail(true);
    let engine = make_engine(&dir, remote.clone());

    engine.queue_mission_progress("u1", "m1", json!({})).await;
    for _ in 0..3 {
        engine.start_sync().await;
    }

    // Even with the remote healthy again, the failed item stays parked.
    remote.set_fail(false);
    let report = engine.start_sync().await;

    assert_eq!(report.processed(), 0);
    assert_eq!(engine.status().await.failed, 1);
}

#[tokio::test]
async fn test_retry_count_stays_consistent_with_status() {
    let dir = tempdir().unwrap();
    let remote = MockRemote::new();
    remote.set_fail(true);
    let engine = make_engine(&dir, remote.clone());

    engine.queue_user_preferences("u1", json!({"theme": "dark"})).await;

    for drain in 1..=3u32 {
        engine.start_sync().await;
        let items = persisted_items(&dir);
        assert_eq!(items[0].retry_count, drain);
        if drain < 3 {
            // Below the cap the item is never Failed.
            assert_eq!(items[0].status, SyncStatus::Pending);
        } else {
            assert_eq!(items[0].status, SyncStatus::Failed);
        }
    }
}

#[tokio::test]
async fn test_concurrent_start_sync_is_rejected() {
    let dir = tempdir().unwrap();
    let remote = MockRemote::new();
    remote.set_delay(StdDuration::from_millis(50));
    let engine = make_engine(&dir, remote);

    engine.queue_analytics_event("u1", "opened_app", json!({})).await;

    let (first, second) = tokio::join!(engine.start_sync(), engine.start_sync());

    // Exactly one drain ran; the other was rejected without touching the
    // queue.
    let (ran, rejected) =
        if first.success { (first, second) } else { (second, first) };
    assert_eq!(ran.synced, 1);
    assert!(!rejected.success);
    assert!(!rejected.errors.is_empty());
    assert_eq!(rejected.processed(), 0);
}

#[tokio::test]
async fn test_force_sync_now_offline_short_circuits() {
    let dir = tempdir().unwrap();
    let engine = Arc::new(make_engine(&dir, MockRemote::new()));

    engine.queue_session_snapshot("u1", json!({"screen": "home"})).await;
    engine.set_online(false);

    let report = engine.force_sync_now().await;

    assert!(!report.success);
    assert_eq!(report.errors, vec!["device is offline".to_string()]);
    assert_eq!(engine.status().await.pending, 1);
}

#[tokio::test]
async fn test_set_online_triggers_background_drain() {
    let dir = tempdir().unwrap();
    let engine = Arc::new(make_engine(&dir, MockRemote::new()));

    engine.set_online(false);
    engine.queue_study_session("u1", study_progress()).await;
    engine.set_online(true);

    tokio::time::sleep(StdDuration::from_millis(100)).await;
    assert_eq!(engine.status().await.synced, 1);
}

#[tokio::test]
async fn test_initialize_drains_startup_queue() {
    let dir = tempdir().unwrap();
    let mut config = make_config(&dir);
    config.startup_sync_delay_ms = 10;
    let engine = Arc::new(SyncEngine::new(config, MockRemote::new()).unwrap());

    engine.queue_study_session("u1", study_progress()).await;
    engine.initialize();

    tokio::time::sleep(StdDuration::from_millis(200)).await;
    assert_eq!(engine.status().await.synced, 1);
}

#[tokio::test]
async fn test_initialize_skips_when_offline() {
    let dir = tempdir().unwrap();
    let mut config = make_config(&dir);
    config.startup_sync_delay_ms = 10;
    let engine = Arc::new(SyncEngine::new(config, MockRemote::new()).unwrap());

    engine.queue_study_session("u1", study_progress()).await;
    engine.set_online(false);
    engine.initialize();

    tokio::time::sleep(StdDuration::from_millis(200)).await;
    assert_eq!(engine.status().await.pending, 1);
}

#[tokio::test]
async fn test_mission_conflict_parks_item_and_snapshot() {
    let dir = tempdir().unwrap();
    let remote = MockRemote::new();
    remote.insert_doc(
        &DocPath::journey("u1", "m1"),
        json!({"percent": 90, "updated_at": ts(2_000).to_rfc3339()}),
    );
    let clock = Arc::new(ManualClock::new(ts(1_000)));
    let engine = make_engine_with_clock(&dir, remote.clone(), clock);

    engine.queue_mission_progress("u1", "m1", json!({"percent": 40})).await;
    let report = engine.start_sync().await;

    assert_eq!(report.conflicts, 1);
    assert_eq!(report.synced, 0);
    assert_eq!(engine.status().await.conflicts, 1);

    let conflicts = engine.conflicts().await;
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].remote["percent"], 90);
    assert_eq!(conflicts[0].local.user_id, "u1");

    // The conflicting attempt wrote nothing.
    assert_eq!(remote.write_count(), 0);
}

#[tokio::test]
async fn test_resolve_keep_remote_syncs_without_write() {
    let dir = tempdir().unwrap();
    let remote = MockRemote::new();
    remote.insert_doc(
        &DocPath::journey("u1", "m1"),
        json!({"percent": 90, "updated_at": ts(2_000).to_rfc3339()}),
    );
    let clock = Arc::new(ManualClock::new(ts(1_000)));
    let engine = make_engine_with_clock(&dir, remote.clone(), clock);

    let item_id = engine.queue_mission_progress("u1", "m1", json!({"percent": 40})).await;
    engine.start_sync().await;

    let applied = engine
        .resolve_conflicts(&[ConflictResolution::keep_remote(&item_id)])
        .await
        .unwrap();

    assert_eq!(applied, 1);
    assert_eq!(engine.status().await.synced, 1);
    assert!(engine.conflicts().await.is_empty());
    // Discarding local changes performs no remote write.
    assert_eq!(remote.write_count(), 0);
}

#[tokio::test]
async fn test_resolve_keep_local_wins_retry() {
    let dir = tempdir().unwrap();
    let remote = MockRemote::new();
    remote.insert_doc(
        &DocPath::journey("u1", "m1"),
        json!({"percent": 90, "updated_at": ts(2_000).to_rfc3339()}),
    );
    let clock = Arc::new(ManualClock::new(ts(1_000)));
    let engine = make_engine_with_clock(&dir, remote.clone(), Arc::clone(&clock));

    let item_id = engine.queue_mission_progress("u1", "m1", json!({"percent": 40})).await;
    engine.start_sync().await;
    assert_eq!(engine.status().await.conflicts, 1);

    // Resolution happens after the remote's last update.
    clock.set(ts(3_000));
    engine
        .resolve_conflicts(&[ConflictResolution::keep_local(&item_id)])
        .await
        .unwrap();
    assert_eq!(engine.status().await.pending, 1);

    let report = engine.start_sync().await;

    assert_eq!(report.synced, 1);
    let doc = remote.doc(&DocPath::journey("u1", "m1")).unwrap();
    assert_eq!(doc["progress"]["percent"], 40);
}

#[tokio::test]
async fn test_resolve_merge_replaces_data_and_requeues() {
    let dir = tempdir().unwrap();
    let remote = MockRemote::new();
    remote.insert_doc(
        &DocPath::journey("u1", "m1"),
        json!({"percent": 90, "updated_at": ts(2_000).to_rfc3339()}),
    );
    let clock = Arc::new(ManualClock::new(ts(1_000)));
    let engine = make_engine_with_clock(&dir, remote.clone(), Arc::clone(&clock));

    let item_id = engine.queue_mission_progress("u1", "m1", json!({"percent": 40})).await;
    engine.start_sync().await;

    clock.set(ts(3_000));
    engine
        .resolve_conflicts(&[ConflictResolution::merge(&item_id, json!({"percent": 95}))])
        .await
        .unwrap();

    assert_eq!(engine.status().await.pending, 1);

    let report = engine.start_sync().await;
    assert_eq!(report.synced, 1);

    let doc = remote.doc(&DocPath::journey("u1", "m1")).unwrap();
    assert_eq!(doc["progress"]["percent"], 95);
}

#[tokio::test]
async fn test_resolve_unknown_item_fails() {
    let dir = tempdir().unwrap();
    let engine = make_engine(&dir, MockRemote::new());

    let err = engine
        .resolve_conflicts(&[ConflictResolution::keep_local("missing")])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ItemNotFound(_)));
}

#[tokio::test]
async fn test_backoff_defers_retry_until_delay_elapses() {
    let dir = tempdir().unwrap();
    let mut config = make_config(&dir);
    config.backoff = BackoffPolicy::exponential(60_000, 600_000);
    let remote = MockRemote::new();
    remote.set_fail(true);
    let clock = Arc::new(ManualClock::new(ts(1_000)));
    let engine = SyncEngine::with_clock(config, remote.clone(), clock.clone()).unwrap();

    engine.queue_user_preferences("u1", json!({"theme": "dark"})).await;
    let report = engine.start_sync().await;
    assert_eq!(report.failed, 1);

    // Immediately after the failure the item is still inside its backoff
    // window, so a drain finds nothing to do.
    remote.set_fail(false);
    let report = engine.start_sync().await;
    assert_eq!(report.processed(), 0);
    assert_eq!(engine.status().await.pending, 1);

    clock.advance(chrono::Duration::seconds(61));
    let report = engine.start_sync().await;
    assert_eq!(report.synced, 1);
}

#[tokio::test]
async fn test_retry_keeps_original_queue_position() {
    let dir = tempdir().unwrap();
    let remote = MockRemote::new();
    remote.set_fail(true);
    let engine = make_engine(&dir, remote.clone());

    let mission_id = engine.queue_mission_progress("u1", "m1", json!({})).await;
    engine.start_sync().await;

    remote.set_fail(false);
    engine.queue_analytics_event("u1", "opened_app", json!({})).await;

    let items = persisted_items(&dir);
    assert_eq!(items[0].id, mission_id);
    assert_eq!(items[0].retry_count, 1);
    assert_eq!(items[1].retry_count, 0);
}

#[tokio::test]
async fn test_queue_survives_engine_restart() {
    let dir = tempdir().unwrap();

    {
        // First engine queues but never drains; dropping it releases the
        // store lock.
        let engine = make_engine(&dir, MockRemote::new());
        engine.queue_study_session("u1", study_progress()).await;
    }

    let engine = make_engine(&dir, MockRemote::new());
    assert_eq!(engine.status().await.pending, 1);

    let report = engine.start_sync().await;
    assert_eq!(report.synced, 1);
}

#[tokio::test]
async fn test_events_broadcast_started_and_completed() {
    let dir = tempdir().unwrap();
    let engine = make_engine(&dir, MockRemote::new());
    let mut events = engine.subscribe();

    engine.queue_study_session("u1", study_progress()).await;
    let report = engine.start_sync().await;

    assert!(matches!(events.recv().await.unwrap(), SyncEvent::Started));
    match events.recv().await.unwrap() {
        SyncEvent::Completed(completed) => assert_eq!(completed, report),
        other => panic!("expected completion event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_clear_queue() {
    let dir = tempdir().unwrap();
    let engine = make_engine(&dir, MockRemote::new());

    engine.queue_study_session("u1", study_progress()).await;
    engine.clear_queue().await;

    assert_eq!(engine.status().await, QueueStatus::default());
    assert!(persisted_items(&dir).is_empty());
}

#[tokio::test]
async fn test_enqueue_generates_distinct_ids() {
    let dir = tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(ts(1_000)));
    let engine = make_engine_with_clock(&dir, MockRemote::new(), clock);

    // Same user, kind, and frozen timestamp: ids must still differ.
    let first = engine.queue_session_snapshot("u1", json!({})).await;
    let second = engine.queue_session_snapshot("u1", json!({})).await;

    assert_ne!(first, second);
}
