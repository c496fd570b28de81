//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Initializing storage and the visited-URL set
//! - Managing the frontier queue
//! - Running fetches concurrently and parsing their pages one at a time
//! - Writing scraped records
//! - Handling interrupts

use crate::config::Config;
use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::crawler::scheduler::Scheduler;
use crate::output::{CrawlSummary, RecordSink, SqliteRecordSink};
use crate::spider::{
    BanDetector, BookSpider, CrawlRequest, FetchedPage, RandomShuffler, Record, SpiderOutput,
    SpiderSettings,
};
use crate::storage::{open_storage, RunStatus, SqliteStorage, SqliteVisitedStore, Storage};
use crate::CrawlerError;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Pages between two progress reports
const PROGRESS_INTERVAL: u64 = 10;

/// Main crawler coordinator structure
pub struct Coordinator {
    storage: Arc<Mutex<SqliteStorage>>,
    scheduler: Scheduler,
    fetcher: Fetcher,
    spider: BookSpider,
    sink: SqliteRecordSink,
    summary: CrawlSummary,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `config_hash` - Hash of the configuration file, recorded with the run
    /// * `fresh` - Whether to forget every visited page before crawling
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CrawlerError)` - Failed to initialize
    pub fn new(config: &Config, config_hash: &str, fresh: bool) -> Result<Self, CrawlerError> {
        let storage_path = Path::new(&config.output.database_path);
        let mut storage = open_storage(storage_path)?;

        if fresh {
            let removed = storage.clear_visited_urls()?;
            tracing::info!("Cleared {} visited URLs", removed);
        }

        if let Some(latest_run) = storage.get_latest_run()? {
            if latest_run.status == RunStatus::Running {
                tracing::warn!(
                    "Run {} did not finish; its visited pages are kept",
                    latest_run.id
                );
                storage.update_run_status(latest_run.id, RunStatus::Interrupted)?;
            }
        }

        let run_id = storage.create_run(config_hash)?;
        let storage = Arc::new(Mutex::new(storage));

        let visited = SqliteVisitedStore::load(storage.clone())?;
        let settings = SpiderSettings::from_config(&config.crawler)?;
        let spider = BookSpider::new(
            settings,
            BanDetector::new(config.crawler.blocked_status_codes.iter().copied()),
            Box::new(visited),
            Box::new(RandomShuffler),
        );

        let fetcher = Fetcher::new(
            &config.user_agent,
            config.crawler.blocked_status_codes.iter().copied(),
        )?;
        let sink = SqliteRecordSink::new(storage.clone(), run_id);

        Ok(Self {
            storage,
            scheduler: Scheduler::new(&config.crawler),
            fetcher,
            spider,
            sink,
            summary: CrawlSummary::new(run_id),
        })
    }

    /// The ID of the run this coordinator records into
    pub fn run_id(&self) -> i64 {
        self.summary.run_id
    }

    /// Runs the main crawl loop until the frontier drains or Ctrl-C
    pub async fn run(&mut self) -> Result<CrawlSummary, CrawlerError> {
        let shutdown = interrupt_listener();
        // Let the listener install its handler before the first dispatch
        tokio::task::yield_now().await;
        self.run_until(shutdown).await
    }

    /// Runs the main crawl loop until the frontier drains or `shutdown`
    /// turns true
    ///
    /// Each pass of the loop:
    /// 1. Dispatches at most one request, if the delay and permits allow
    /// 2. Waits for whichever comes first: a finished fetch, the next
    ///    dispatch slot, or shutdown
    /// 3. Hands a finished page to the spider, queues follow-up requests and
    ///    writes records
    ///
    /// Shutdown aborts in-flight fetches and records the run as interrupted.
    pub async fn run_until(
        &mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<CrawlSummary, CrawlerError> {
        tracing::info!("Starting crawl run {}", self.summary.run_id);
        let start_time = Instant::now();

        self.schedule(self.spider.start_request());

        let mut in_flight: JoinSet<FetchResult> = JoinSet::new();

        let status = loop {
            if *shutdown.borrow() {
                tracing::warn!("Interrupted, stopping {} in-flight fetches", in_flight.len());
                in_flight.abort_all();
                break RunStatus::Interrupted;
            }

            if let Some(scheduled) = self.scheduler.try_next_request() {
                let fetcher = self.fetcher.clone();
                in_flight.spawn(async move {
                    let result = fetcher.fetch(&scheduled.request).await;
                    drop(scheduled.permit);
                    result
                });
            }

            if in_flight.is_empty() && self.scheduler.is_empty() {
                tracing::info!("Frontier is empty, crawl complete");
                break RunStatus::Completed;
            }

            let next_dispatch = self.scheduler.next_dispatch_at();

            tokio::select! {
                biased;

                Ok(()) = shutdown.changed() => {}
                Some(joined) = in_flight.join_next() => match joined {
                    Ok(result) => self.handle_fetch(result),
                    Err(e) => {
                        tracing::error!("Fetch task failed: {}", e);
                        self.summary.dropped_pages += 1;
                    }
                },
                _ = sleep_until_dispatch(next_dispatch), if next_dispatch.is_some() => {}
                else => {}
            }
        };

        self.summary.duration_seconds = start_time.elapsed().as_secs();
        self.sink
            .finalize(status, &self.summary.totals)
            .map_err(|e| CrawlerError::Storage(e.to_string()))?;

        tracing::info!(
            "Crawl {}: {} pages, {} books, {} comments in {:?}",
            status.to_db_string(),
            self.summary.totals.pages_crawled,
            self.summary.totals.books_scraped,
            self.summary.totals.comments_scraped,
            start_time.elapsed()
        );

        Ok(self.summary.clone())
    }

    fn handle_fetch(&mut self, result: FetchResult) {
        match result {
            FetchResult::Page(page) => self.handle_page(&page),
            FetchResult::UnexpectedStatus { url, status_code } => {
                tracing::warn!("Dropping {}: unexpected HTTP {}", url, status_code);
                self.summary.dropped_pages += 1;
            }
            FetchResult::NetworkError { url, error } => {
                tracing::warn!("Dropping {}: {}", url, error);
                self.summary.dropped_pages += 1;
            }
        }
    }

    fn handle_page(&mut self, page: &FetchedPage) {
        let blocked = self.spider.is_blocked(page.status);
        let outputs = self.spider.parse(page);

        if blocked {
            self.summary.retries += 1;
        } else {
            self.summary.totals.pages_crawled += 1;
            tracing::debug!(
                "Parsed {} ({}): {} outputs",
                page.url,
                page.callback,
                outputs.len()
            );
        }

        for output in outputs {
            match output {
                SpiderOutput::Request(request) => self.schedule(request),
                SpiderOutput::Record(record) => self.write(&record),
            }
        }

        if !blocked && self.summary.totals.pages_crawled % PROGRESS_INTERVAL == 0 {
            self.report_progress();
        }
    }

    fn schedule(&mut self, request: CrawlRequest) {
        if self.scheduler.enqueue(request).is_err() {
            self.summary.filtered_requests += 1;
        }
    }

    fn write(&mut self, record: &Record) {
        match self.sink.write_record(record) {
            Ok(true) => match record {
                Record::Book(_) => self.summary.totals.books_scraped += 1,
                Record::Comment(_) => self.summary.totals.comments_scraped += 1,
            },
            Ok(false) => self.summary.duplicate_books += 1,
            Err(e) => tracing::error!("Failed to store record: {}", e),
        }
    }

    fn report_progress(&self) {
        tracing::info!(
            "Progress: {} pages crawled, {} books, {} comments, {} in frontier, {} visited",
            self.summary.totals.pages_crawled,
            self.summary.totals.books_scraped,
            self.summary.totals.comments_scraped,
            self.scheduler.frontier_size(),
            self.spider.visited_count()
        );

        let stored = self
            .storage
            .lock()
            .map_err(|e| e.to_string())
            .and_then(|mut storage| {
                storage
                    .update_run_totals(self.summary.run_id, &self.summary.totals)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = stored {
            tracing::error!("Failed to save run progress: {}", e);
        }
    }
}

/// Spawns a task that flips the returned receiver to true on Ctrl-C
///
/// The signal handler is installed when the task is first polled.
pub fn interrupt_listener() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Ctrl-C received, finishing run as interrupted");
                let _ = tx.send(true);
            }
            Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
        }
    });
    rx
}

async fn sleep_until_dispatch(at: Option<tokio::time::Instant>) {
    if let Some(at) = at {
        tokio::time::sleep_until(at).await;
    }
}

/// Runs a complete crawl
///
/// # Process
///
/// 1. Open the database and start a new run
/// 2. Load the visited-URL set
/// 3. Fetch the tag index and every category listing beneath it
/// 4. Fetch the comment threads of every listed book
/// 5. Mark the run as completed (or interrupted)
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the configuration file
/// * `fresh` - Whether to forget every visited page first
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl finished
/// * `Err(CrawlerError)` - Crawl failed with an error
///
/// # Example
///
/// ```no_run
/// use doubook_crawler::config::load_config_with_hash;
/// use doubook_crawler::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("config.toml"))?;
/// let summary = run_crawl(&config, &hash, false).await?;
/// println!("{} books", summary.totals.books_scraped);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: &Config,
    config_hash: &str,
    fresh: bool,
) -> Result<CrawlSummary, CrawlerError> {
    let mut coordinator = Coordinator::new(config, config_hash, fresh)?;
    coordinator.run().await
}
