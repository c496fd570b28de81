//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::spider::{BookRecord, CommentRecord};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, RunTotals};
use crate::CrawlerError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, config_hash, status, pages_crawled, books_scraped, comments_scraped";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(CrawlerError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, CrawlerError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, CrawlerError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
        totals: RunTotals {
            pages_crawled: row.get::<_, i64>(5)? as u64,
            books_scraped: row.get::<_, i64>(6)? as u64,
            comments_scraped: row.get::<_, i64>(7)? as u64,
        },
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<CommentRecord> {
    Ok(CommentRecord {
        book_id: row.get(0)?,
        user: row.get(1)?,
        rating: row.get(2)?,
        vote: row.get(3)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        Ok(())
    }

    fn update_run_totals(&mut self, run_id: i64, totals: &RunTotals) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE runs SET pages_crawled = ?1, books_scraped = ?2, comments_scraped = ?3
             WHERE id = ?4",
            params![
                totals.pages_crawled as i64,
                totals.books_scraped as i64,
                totals.comments_scraped as i64,
                run_id
            ],
        )?;
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Completed.to_db_string(), now, run_id],
        )?;
        Ok(())
    }

    // ===== Visited URLs =====

    fn load_visited_urls(&self) -> StorageResult<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT url FROM visited_urls")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut urls = HashSet::new();
        for row in rows {
            urls.insert(row?);
        }
        Ok(urls)
    }

    fn insert_visited_url(&mut self, url: &str) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO visited_urls (url, visited_at) VALUES (?1, ?2)",
            params![url, now],
        )?;
        Ok(inserted > 0)
    }

    fn clear_visited_urls(&mut self) -> StorageResult<u64> {
        let removed = self.conn.execute("DELETE FROM visited_urls", [])?;
        Ok(removed as u64)
    }

    fn count_visited_urls(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM visited_urls")
    }

    // ===== Records =====

    fn insert_book(&mut self, book: &BookRecord) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO books (id, title, author, rating, scraped_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![book.id, book.title, book.author, book.rating, now],
        )?;
        Ok(inserted > 0)
    }

    fn get_book(&self, id: i64) -> StorageResult<Option<BookRecord>> {
        let book = self
            .conn
            .query_row(
                "SELECT id, title, author, rating FROM books WHERE id = ?1",
                params![id],
                |row| {
                    Ok(BookRecord {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        author: row.get(2)?,
                        rating: row.get(3)?,
                    })
                },
            )
            .optional()?;

        Ok(book)
    }

    fn insert_comment(&mut self, comment: &CommentRecord) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO comments (book_id, user, rating, vote, scraped_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                comment.book_id,
                comment.user,
                comment.rating,
                comment.vote,
                now
            ],
        )?;
        Ok(())
    }

    fn get_comments_for_book(&self, book_id: i64) -> StorageResult<Vec<CommentRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT book_id, user, rating, vote FROM comments WHERE book_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![book_id], comment_from_row)?;

        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }

    // ===== Statistics =====

    fn count_books(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM books")
    }

    fn count_comments(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM comments")
    }

    fn average_book_rating(&self) -> StorageResult<Option<f64>> {
        let average = self
            .conn
            .query_row("SELECT AVG(rating) FROM books", [], |row| {
                row.get::<_, Option<f64>>(0)
            })?;
        Ok(average)
    }

    fn comment_rating_histogram(&self) -> StorageResult<BTreeMap<u8, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT rating, COUNT(*) FROM comments GROUP BY rating")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, u8>(0)?, row.get::<_, i64>(1)?)))?;

        let mut histogram = BTreeMap::new();
        for row in rows {
            let (rating, count) = row?;
            histogram.insert(rating, count as u64);
        }
        Ok(histogram)
    }
}
