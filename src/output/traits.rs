//! Record sink traits and types
//!
//! This module defines the trait interface for record sinks and the summary
//! produced at the end of a crawl.

use crate::spider::{BookRecord, CommentRecord, Record};
use crate::storage::{RunStatus, RunTotals};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Summary of one crawl run
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    pub run_id: i64,

    /// Page, book and comment counters as stored with the run
    pub totals: RunTotals,

    /// Books emitted but already present from an earlier pass
    pub duplicate_books: u64,

    /// Blocked pages that were requested again
    pub retries: u64,

    /// Responses dropped for an unexpected status or a transport error
    pub dropped_pages: u64,

    /// Requests rejected by the scheduler (duplicates or foreign hosts)
    pub filtered_requests: u64,

    pub duration_seconds: u64,
}

impl CrawlSummary {
    /// Creates a new empty crawl summary
    pub fn new(run_id: i64) -> Self {
        Self {
            run_id,
            ..Self::default()
        }
    }

    /// Share of fetched pages that had to be retried, as a percentage
    pub fn retry_rate(&self) -> f64 {
        let fetched = self.totals.pages_crawled + self.retries;
        if fetched == 0 {
            return 0.0;
        }
        (self.retries as f64 / fetched as f64) * 100.0
    }
}

/// Trait for record sinks
///
/// A sink receives every record the spider emits, in emission order.
pub trait RecordSink {
    /// Writes a book
    ///
    /// Returns false if a book with the same id was already stored.
    fn write_book(&self, book: &BookRecord) -> OutputResult<bool>;

    /// Writes a comment
    fn write_comment(&self, comment: &CommentRecord) -> OutputResult<()>;

    /// Writes any record
    ///
    /// Returns false only for a book that was already stored.
    fn write_record(&self, record: &Record) -> OutputResult<bool> {
        match record {
            Record::Book(book) => self.write_book(book),
            Record::Comment(comment) => self.write_comment(comment).map(|_| true),
        }
    }

    /// Finalizes the output, storing the run counters and final status
    ///
    /// # Arguments
    ///
    /// * `status` - The final status of the crawl run
    /// * `totals` - The run counters
    fn finalize(&self, status: RunStatus, totals: &RunTotals) -> OutputResult<()>;
}
