// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Local persistent queue store.
//!
//! The queue and its conflict records live in a store directory as two JSON
//! files, mirroring the key-value layout the app persists:
//!
//! - `sync_queue.json` - array of pending/settled sync items
//! - `sync_conflicts.json` - array of conflict records awaiting resolution
//!
//! Every mutating call writes through to disk synchronously with fsync.
//! Write failures are logged and swallowed: the in-memory queue still holds
//! the item for the current session, but durability across restarts is not
//! guaranteed on a failed write.
//!
//! An advisory `fs2` lock on the store directory is held for the store's
//! lifetime, so a second process opening the same directory fails fast with
//! `StoreLocked` instead of racing on the files.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{de::DeserializeOwned, Serialize};

use prepsync_core::{ConflictRecord, Error, QueueStatus, Result, SyncItem};

const QUEUE_FILE: &str = "sync_queue.json";
const CONFLICTS_FILE: &str = "sync_conflicts.json";
const LOCK_FILE: &str = "lock";

/// File-backed store for the sync queue and its conflict records.
#[derive(Debug)]
pub struct QueueStore {
    dir: PathBuf,
    /// Held for the store's lifetime; dropping releases the advisory lock.
    _lock: File,
    items: Vec<SyncItem>,
    conflicts: Vec<ConflictRecord>,
}

impl QueueStore {
    /// Opens or creates a store at the given directory and hydrates it.
    ///
    /// Fails with [`Error::StoreLocked`] if another process holds the store.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(dir.join(LOCK_FILE))?;
        lock.try_lock_exclusive().map_err(|e| {
            if e.kind() == std::io::ErrorKind::WouldBlock {
                Error::StoreLocked(dir.display().to_string())
            } else {
                Error::Io(e)
            }
        })?;

        let mut store = QueueStore { dir, _lock: lock, items: Vec::new(), conflicts: Vec::new() };
        store.reload()?;
        Ok(store)
    }

    /// Re-hydrates the queue and conflict records from disk.
    pub fn reload(&mut self) -> Result<()> {
        self.items = read_json_array(&self.dir.join(QUEUE_FILE))?;
        self.conflicts = read_json_array(&self.dir.join(CONFLICTS_FILE))?;
        Ok(())
    }

    /// Appends an item and writes through to disk.
    ///
    /// A failed write does not abort the enqueue; the item stays in memory
    /// for the current session and the failure is logged.
    pub fn enqueue(&mut self, item: SyncItem) {
        self.items.push(item);
        if let Err(e) = self.persist() {
            tracing::warn!(error = %e, "failed to persist sync queue; item held in memory only");
        }
    }

    /// Overwrites both stored files with the in-memory state.
    pub fn persist(&self) -> Result<()> {
        write_json_array(&self.dir.join(QUEUE_FILE), &self.items)?;
        write_json_array(&self.dir.join(CONFLICTS_FILE), &self.conflicts)?;
        Ok(())
    }

    /// Empties the queue and conflict records, in memory and on disk.
    pub fn clear(&mut self) -> Result<()> {
        self.items.clear();
        self.conflicts.clear();
        self.persist()
    }

    pub fn items(&self) -> &[SyncItem] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [SyncItem] {
        &mut self.items
    }

    /// Finds a queued item by id.
    pub fn find_mut(&mut self, id: &str) -> Option<&mut SyncItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// Records a conflict snapshot alongside its item.
    pub fn push_conflict(&mut self, record: ConflictRecord) {
        self.conflicts.push(record);
    }

    pub fn conflicts(&self) -> &[ConflictRecord] {
        &self.conflicts
    }

    /// Drops the conflict records for the given item id. Returns true if any
    /// record was removed.
    pub fn remove_conflict(&mut self, item_id: &str) -> bool {
        let before = self.conflicts.len();
        self.conflicts.retain(|record| record.local.id != item_id);
        self.conflicts.len() != before
    }

    /// Whole-queue counts by status.
    pub fn status(&self) -> QueueStatus {
        QueueStatus::from_items(&self.items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Reads a JSON array file, returning an empty vec if it doesn't exist.
fn read_json_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let raw = fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(&raw)
        .map_err(|e| Error::CorruptedData(format!("{}: {}", path.display(), e)))
}

/// Writes a JSON array file with fsync for durability.
fn write_json_array<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let json = serde_json::to_string(records)?;
    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
