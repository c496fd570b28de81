//! Visited-URL tracking
//!
//! A page URL is recorded the first time its records are extracted. Recorded
//! pages are still parsed for pagination and follow-up requests, but their
//! records are never extracted again, in this run or any later one.

use crate::storage::sqlite::SqliteStorage;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Set of page URLs whose records were already extracted
pub trait VisitedStore: Send {
    /// Returns true if the URL was already recorded
    fn contains(&self, url: &str) -> bool;

    /// Records the URL if absent
    ///
    /// Returns true when the URL was newly recorded, false when it was
    /// already present. Check and insert happen in one step.
    fn mark_visited(&mut self, url: &str) -> StorageResult<bool>;

    /// Number of recorded URLs
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local store, used in tests and dry runs
#[derive(Debug, Default, Clone)]
pub struct MemoryVisitedStore {
    urls: HashSet<String>,
}

impl MemoryVisitedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with the given URLs
    pub fn with_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
        }
    }
}

impl VisitedStore for MemoryVisitedStore {
    fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    fn mark_visited(&mut self, url: &str) -> StorageResult<bool> {
        Ok(self.urls.insert(url.to_string()))
    }

    fn len(&self) -> usize {
        self.urls.len()
    }
}

/// SQLite-backed store
///
/// All URLs are loaded once when the store is opened; new URLs are written
/// through to the database before they are added to the in-memory set.
pub struct SqliteVisitedStore {
    storage: Arc<Mutex<SqliteStorage>>,
    urls: HashSet<String>,
}

impl SqliteVisitedStore {
    /// Opens the store, loading every previously visited URL
    pub fn load(storage: Arc<Mutex<SqliteStorage>>) -> StorageResult<Self> {
        let urls = {
            let storage = lock(&storage)?;
            storage.load_visited_urls()?
        };
        tracing::info!("Loaded {} visited URLs", urls.len());
        Ok(Self { storage, urls })
    }
}

impl VisitedStore for SqliteVisitedStore {
    fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    fn mark_visited(&mut self, url: &str) -> StorageResult<bool> {
        if self.urls.contains(url) {
            return Ok(false);
        }

        let inserted = {
            let mut storage = lock(&self.storage)?;
            storage.insert_visited_url(url)?
        };
        self.urls.insert(url.to_string());
        Ok(inserted)
    }

    fn len(&self) -> usize {
        self.urls.len()
    }
}

fn lock(
    storage: &Arc<Mutex<SqliteStorage>>,
) -> StorageResult<std::sync::MutexGuard<'_, SqliteStorage>> {
    storage
        .lock()
        .map_err(|e| StorageError::Database(format!("Failed to lock storage: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "http://book.douban.com/tag/小说";

    #[test]
    fn test_memory_mark_is_insert_if_absent() {
        let mut store = MemoryVisitedStore::new();
        assert!(store.is_empty());
        assert!(store.mark_visited(URL).unwrap());
        assert!(!store.mark_visited(URL).unwrap());
        assert!(store.contains(URL));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_memory_with_urls() {
        let store = MemoryVisitedStore::with_urls([URL]);
        assert!(store.contains(URL));
        assert!(!store.contains("http://book.douban.com/tag/历史"));
    }

    #[test]
    fn test_sqlite_store_persists_across_loads() {
        let storage = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));

        let mut store = SqliteVisitedStore::load(storage.clone()).unwrap();
        assert!(store.mark_visited(URL).unwrap());
        assert!(!store.mark_visited(URL).unwrap());

        let reloaded = SqliteVisitedStore::load(storage).unwrap();
        assert!(reloaded.contains(URL));
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_sqlite_store_sees_rows_written_elsewhere() {
        let storage = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
        storage.lock().unwrap().insert_visited_url(URL).unwrap();

        let mut store = SqliteVisitedStore::load(storage).unwrap();
        assert!(store.contains(URL));
        assert!(!store.mark_visited(URL).unwrap());
    }
}
