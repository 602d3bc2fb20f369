// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the sync client tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use prepsync_core::{ClockSource, StudyProgress};

use crate::remote::{DocPath, RemoteError, RemoteResult, RemoteStore};

/// Fixed timestamp helper: `secs` after the Unix epoch.
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap()
}

/// The study session used by the drain scenarios.
pub fn study_progress() -> StudyProgress {
    StudyProgress {
        session_id: "s1".to_string(),
        subject: "Math".to_string(),
        time_spent_minutes: 30,
        questions_answered: 10,
        accuracy: 0.8,
    }
}

/// A clock tests move by hand.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock { now: Mutex::new(start) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// A write observed by [`MockRemote`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedWrite {
    Put { path: String, doc: Value, merge: bool },
    Add { collection: String, doc: Value },
}

/// Mock remote store for testing without a real backend.
///
/// Documents live in a shared map, writes are recorded, and clones share all
/// state: keep a clone to inspect calls after moving the original into an
/// engine.
#[derive(Clone)]
pub struct MockRemote {
    docs: Arc<Mutex<HashMap<String, Value>>>,
    writes: Arc<Mutex<Vec<RecordedWrite>>>,
    /// When set, every call fails with a transient error.
    fail: Arc<AtomicBool>,
    /// Artificial latency per call, for overlap tests.
    delay: Arc<Mutex<Option<Duration>>>,
    next_add_id: Arc<AtomicUsize>,
}

impl MockRemote {
    pub fn new() -> Self {
        MockRemote {
            docs: Arc::new(Mutex::new(HashMap::new())),
            writes: Arc::new(Mutex::new(Vec::new())),
            fail: Arc::new(AtomicBool::new(false)),
            delay: Arc::new(Mutex::new(None)),
            next_add_id: Arc::new(AtomicUsize::new(1)),
        }
    }

    /// Seeds a remote document.
    pub fn insert_doc(&self, path: &DocPath, doc: Value) {
        self.docs.lock().unwrap().insert(path.as_str().to_string(), doc);
    }

    /// Reads a document out of the mock state.
    pub fn doc(&self, path: &DocPath) -> Option<Value> {
        self.docs.lock().unwrap().get(path.as_str()).cloned()
    }

    /// All writes attempted so far, in order.
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().unwrap().clone()
    }

    /// Number of write calls attempted (put + add).
    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    /// Makes every subsequent call fail (or succeed again).
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Adds artificial latency to every call.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_fail(&self) -> RemoteResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(RemoteError::RequestFailed("mock remote failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for MockRemote {
    fn get(
        &mut self,
        path: &DocPath,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<Option<Value>>> + Send + '_>> {
        let path = path.as_str().to_string();
        Box::pin(async move {
            self.pause().await;
            self.check_fail()?;
            Ok(self.docs.lock().unwrap().get(&path).cloned())
        })
    }

    fn put(
        &mut self,
        path: &DocPath,
        doc: Value,
        merge: bool,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<()>> + Send + '_>> {
        let path = path.as_str().to_string();
        Box::pin(async move {
            self.pause().await;
            self.writes.lock().unwrap().push(RecordedWrite::Put {
                path: path.clone(),
                doc: doc.clone(),
                merge,
            });
            self.check_fail()?;

            let mut docs = self.docs.lock().unwrap();
            match docs.get_mut(&path) {
                Some(Value::Object(existing)) if merge => {
                    if let Value::Object(incoming) = doc {
                        for (key, value) in incoming {
                            existing.insert(key, value);
                        }
                    }
                }
                _ => {
                    docs.insert(path, doc);
                }
            }
            Ok(())
        })
    }

    fn add(
        &mut self,
        collection: &DocPath,
        doc: Value,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<String>> + Send + '_>> {
        let collection = collection.as_str().to_string();
        Box::pin(async move {
            self.pause().await;
            self.writes.lock().unwrap().push(RecordedWrite::Add {
                collection: collection.clone(),
                doc: doc.clone(),
            });
            self.check_fail()?;

            let id = format!("gen-{}", self.next_add_id.fetch_add(1, Ordering::SeqCst));
            self.docs.lock().unwrap().insert(format!("{}/{}", collection, id), doc);
            Ok(id)
        })
    }
}
