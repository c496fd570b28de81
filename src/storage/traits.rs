//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::spider::{BookRecord, CommentRecord};
use crate::storage::{RunRecord, RunStatus, RunTotals};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by the crawler.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Stores the running page, book and comment counters of a run
    fn update_run_totals(&mut self, run_id: i64, totals: &RunTotals) -> StorageResult<()>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    // ===== Visited URLs =====

    /// Loads every visited page URL
    fn load_visited_urls(&self) -> StorageResult<HashSet<String>>;

    /// Records a visited page URL
    ///
    /// Returns true if the URL was not recorded before.
    fn insert_visited_url(&mut self, url: &str) -> StorageResult<bool>;

    /// Forgets every visited page URL
    ///
    /// Returns the number of URLs removed.
    fn clear_visited_urls(&mut self) -> StorageResult<u64>;

    fn count_visited_urls(&self) -> StorageResult<u64>;

    // ===== Records =====

    /// Stores a book unless one with the same id already exists
    ///
    /// Returns true if the book was inserted.
    fn insert_book(&mut self, book: &BookRecord) -> StorageResult<bool>;

    fn get_book(&self, id: i64) -> StorageResult<Option<BookRecord>>;

    /// Stores a comment; comments have no natural key and are always inserted
    fn insert_comment(&mut self, comment: &CommentRecord) -> StorageResult<()>;

    fn get_comments_for_book(&self, book_id: i64) -> StorageResult<Vec<CommentRecord>>;

    // ===== Statistics =====

    fn count_books(&self) -> StorageResult<u64>;

    fn count_comments(&self) -> StorageResult<u64>;

    /// Mean listing rating over all stored books, None when there are none
    fn average_book_rating(&self) -> StorageResult<Option<f64>>;

    /// Number of comments per star rating
    fn comment_rating_histogram(&self) -> StorageResult<BTreeMap<u8, u64>>;
}
