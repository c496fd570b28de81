//! SQLite-based record sink implementation
//!
//! This module provides a record sink that writes books and comments
//! directly to the SQLite storage backend.

use crate::output::traits::{OutputError, OutputResult, RecordSink};
use crate::spider::{BookRecord, CommentRecord};
use crate::storage::{RunStatus, RunTotals, Storage};
use std::sync::{Arc, Mutex, MutexGuard};

/// SQLite-based record sink
///
/// Books are keyed by id and stored once; comments are appended.
pub struct SqliteRecordSink {
    storage: Arc<Mutex<dyn Storage + Send>>,
    run_id: i64,
}

impl SqliteRecordSink {
    /// Creates a new SQLite record sink
    ///
    /// # Arguments
    ///
    /// * `storage` - The storage backend to use
    /// * `run_id` - The current run ID
    pub fn new(storage: Arc<Mutex<dyn Storage + Send>>, run_id: i64) -> Self {
        Self { storage, run_id }
    }

    fn lock(&self) -> OutputResult<MutexGuard<'_, dyn Storage + Send + 'static>> {
        self.storage
            .lock()
            .map_err(|e| OutputError::Storage(format!("Failed to lock storage: {}", e)))
    }
}

impl RecordSink for SqliteRecordSink {
    fn write_book(&self, book: &BookRecord) -> OutputResult<bool> {
        let mut storage = self.lock()?;
        let inserted = storage
            .insert_book(book)
            .map_err(|e| OutputError::Storage(e.to_string()))?;

        if !inserted {
            tracing::debug!("Book {} already stored", book.id);
        }
        Ok(inserted)
    }

    fn write_comment(&self, comment: &CommentRecord) -> OutputResult<()> {
        let mut storage = self.lock()?;
        storage
            .insert_comment(comment)
            .map_err(|e| OutputError::Storage(e.to_string()))
    }

    fn finalize(&self, status: RunStatus, totals: &RunTotals) -> OutputResult<()> {
        let mut storage = self.lock()?;

        storage
            .update_run_totals(self.run_id, totals)
            .map_err(|e| OutputError::Storage(e.to_string()))?;

        match status {
            RunStatus::Completed => storage.complete_run(self.run_id),
            other => storage.update_run_status(self.run_id, other),
        }
        .map_err(|e| OutputError::Storage(e.to_string()))?;

        Ok(())
    }
}
