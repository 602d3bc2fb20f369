// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! prepsync - Offline-aware background sync for the prepsync study app.
//!
//! Local mutations (mission progress, study sessions, analytics events,
//! preferences, session snapshots) are captured as queue items, persisted on
//! device, and drained to the remote document store when connectivity
//! allows.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Engine    │────►│ RemoteStore │────►│  Document   │
//! │ (SyncEngine)│◄────│   (trait)   │◄────│  database   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ QueueStore  │  (persisted queue + conflict records)
//! └─────────────┘
//! ```
//!
//! # Features
//!
//! - Durable local queue with write-through JSON persistence
//! - Strictly ordered, sequential drains with a bounded retry budget
//! - Timestamp conflict detection for mission writes, with caller-driven
//!   resolution (keep local / keep remote / merge)
//! - Injectable backoff policy, clock, and remote store for testing
//! - Drain lifecycle events over a broadcast channel
//!
//! # Usage
//!
//! ```rust,ignore
//! use prepsync::{HttpRemoteStore, SyncConfig, SyncEngine};
//!
//! let remote = HttpRemoteStore::new("https://api.example.com").with_auth_token(token);
//! let engine = Arc::new(SyncEngine::new(SyncConfig::default(), remote)?);
//! engine.initialize();
//!
//! engine.queue_study_session("u1", progress).await;
//! let report = engine.force_sync_now().await;
//! ```

pub mod config;
pub mod engine;
pub mod events;
pub mod remote;
pub mod rest;
pub mod retry;
pub mod store;
pub mod syncer;

pub use config::SyncConfig;
pub use engine::SyncEngine;
pub use events::SyncEvent;
pub use remote::{DocPath, RemoteError, RemoteResult, RemoteStore};
pub use rest::HttpRemoteStore;
pub use retry::BackoffPolicy;
pub use store::QueueStore;
pub use syncer::SyncOutcome;

pub use prepsync_core::{
    ClockSource, ConflictRecord, ConflictResolution, Error, PayloadKind, QueueStatus, Resolution,
    Result, StudyProgress, SyncItem, SyncPayload, SyncReport, SyncStatus, SystemClock,
};

#[cfg(test)]
mod test_helpers;
