// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote document store abstraction.
//!
//! The remote is a hosted document database addressed by slash-separated
//! paths. This trait is the seam between the orchestrator and whatever
//! backend actually holds the documents:
//! - [`HttpRemoteStore`](crate::rest::HttpRemoteStore) for production
//! - Mock stores for unit testing
//!
//! The database's own wire protocol stays opaque behind this surface.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

/// Error type for remote store operations.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The request never completed (connectivity, DNS, timeout).
    #[error("remote request failed: {0}")]
    RequestFailed(String),

    /// The remote answered with a non-success status.
    #[error("remote returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The remote answered with a body this client cannot use.
    #[error("invalid remote document: {0}")]
    InvalidDocument(String),
}

/// Result type for remote store operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// A slash-separated path addressing one document or collection.
///
/// Constructors cover the five remote surfaces the sync queue writes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath(String);

impl DocPath {
    /// `users/{user_id}/journeys/{mission_id}` - mission progress document.
    pub fn journey(user_id: &str, mission_id: &str) -> Self {
        DocPath(format!("users/{}/journeys/{}", user_id, mission_id))
    }

    /// `users/{user_id}/study_sessions` - append-only session log.
    pub fn study_sessions(user_id: &str) -> Self {
        DocPath(format!("users/{}/study_sessions", user_id))
    }

    /// `users/{user_id}/analytics_events` - append-only event log.
    pub fn analytics_events(user_id: &str) -> Self {
        DocPath(format!("users/{}/analytics_events", user_id))
    }

    /// `users/{user_id}` - the user document itself (preferences).
    pub fn user(user_id: &str) -> Self {
        DocPath(format!("users/{}", user_id))
    }

    /// `users/{user_id}/sessions/{item_id}` - generic session snapshot.
    pub fn session(user_id: &str, item_id: &str) -> Self {
        DocPath(format!("users/{}/sessions/{}", user_id, item_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait for document-database access.
///
/// This trait abstracts over the actual backend, allowing for easy testing
/// with mock implementations. Implementations that borrow `path` must copy
/// it before constructing their future.
pub trait RemoteStore: Send + Sync {
    /// Reads one document. Returns `None` if it doesn't exist.
    fn get(
        &mut self,
        path: &DocPath,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<Option<Value>>> + Send + '_>>;

    /// Writes one document. With `merge`, fields not present in `doc` are
    /// left untouched on the remote; otherwise the document is replaced.
    fn put(
        &mut self,
        path: &DocPath,
        doc: Value,
        merge: bool,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<()>> + Send + '_>>;

    /// Appends a document to a collection, returning its generated id.
    fn add(
        &mut self,
        collection: &DocPath,
        doc: Value,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<String>> + Send + '_>>;
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
