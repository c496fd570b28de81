//! Output module for scraped records and crawl reports
//!
//! This module handles:
//! - Writing book and comment records as they are scraped
//! - Summarizing a finished crawl
//! - Reporting statistics over the whole database

mod sqlite_output;
pub mod stats;
mod traits;

pub use sqlite_output::SqliteRecordSink;
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
pub use traits::{CrawlSummary, OutputError, OutputResult, RecordSink};

/// Prints a finished crawl's summary to stdout
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary (run {}) ===\n", summary.run_id);
    println!("  Pages crawled: {}", summary.totals.pages_crawled);
    println!(
        "  Books scraped: {} ({} already stored)",
        summary.totals.books_scraped, summary.duplicate_books
    );
    println!("  Comments scraped: {}", summary.totals.comments_scraped);
    println!(
        "  Retries after blocking: {} ({:.1}%)",
        summary.retries,
        summary.retry_rate()
    );
    println!("  Dropped responses: {}", summary.dropped_pages);
    println!("  Filtered requests: {}", summary.filtered_requests);
    println!("  Duration: {} seconds", summary.duration_seconds);
}
