//! Statistics generation from crawl database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::storage::{RunRecord, Storage};
use crate::CrawlerError;
use std::collections::BTreeMap;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Pages whose records were extracted, over all runs
    pub visited_pages: u64,

    pub books: u64,

    pub comments: u64,

    /// Mean listing rating of the stored books
    pub average_book_rating: Option<f64>,

    /// Comment count per star rating
    pub rating_histogram: BTreeMap<u8, u64>,

    /// The most recent crawl run
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(CrawlerError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlStatistics, CrawlerError> {
    Ok(CrawlStatistics {
        visited_pages: storage.count_visited_urls()?,
        books: storage.count_books()?,
        comments: storage.count_comments()?,
        average_book_rating: storage.average_book_rating()?,
        rating_histogram: storage.comment_rating_histogram()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages scraped: {}", stats.visited_pages);
    println!("  Books: {}", stats.books);
    println!("  Comments: {}", stats.comments);
    match stats.average_book_rating {
        Some(rating) => println!("  Average book rating: {:.2}", rating),
        None => println!("  Average book rating: n/a"),
    }
    println!();

    if !stats.rating_histogram.is_empty() {
        println!("Comment Ratings:");
        for stars in (1..=5u8).rev() {
            let count = stats.rating_histogram.get(&stars).copied().unwrap_or(0);
            let percentage = if stats.comments > 0 {
                (count as f64 / stats.comments as f64) * 100.0
            } else {
                0.0
            };
            println!(
                "  {:<5} {} ({:.1}%)",
                "*".repeat(stars as usize),
                count,
                percentage
            );
        }
        println!();
    }

    if let Some(run) = &stats.latest_run {
        println!("Latest Run:");
        println!("  ID: {}", run.id);
        println!("  Status: {}", run.status.to_db_string());
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!(
            "  Pages: {}, books: {}, comments: {}",
            run.totals.pages_crawled, run.totals.books_scraped, run.totals.comments_scraped
        );
    }
}
