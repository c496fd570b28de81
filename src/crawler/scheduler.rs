//! Scheduler for managing the crawl frontier and rate limiting
//!
//! This module handles:
//! - FIFO queue management for requests to fetch
//! - Duplicate request filtering
//! - Allowed-domain filtering
//! - Global concurrency limiting via semaphores
//! - Tracking when the download delay allows the next dispatch

use crate::config::CrawlerConfig;
use crate::spider::CrawlRequest;
use crate::url::is_allowed_domain;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// A scheduled fetch with a semaphore permit
pub struct ScheduledFetch {
    /// The request to fetch
    pub request: CrawlRequest,

    /// The semaphore permit for this fetch; released when dropped
    pub permit: OwnedSemaphorePermit,
}

/// Why a request was not queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The URL was already scheduled in this run
    Duplicate,

    /// The URL's host is not in the allowed domains
    OffSite,
}

/// Scheduler manages the frontier queue and rate limiting
///
/// The scheduler coordinates:
/// - Global concurrency limits (max fetches in flight)
/// - A fixed delay between consecutive dispatches
/// - First-in first-out ordering of queued requests
pub struct Scheduler {
    /// Global semaphore for limiting concurrent fetches
    global_semaphore: Arc<Semaphore>,

    /// Queued requests, oldest first
    frontier: VecDeque<CrawlRequest>,

    /// Every URL scheduled so far in this run
    seen: HashSet<String>,

    allowed_domains: Vec<String>,

    download_delay: Duration,

    last_dispatch: Option<Instant>,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    ///
    /// # Returns
    ///
    /// A new Scheduler instance
    pub fn new(config: &CrawlerConfig) -> Self {
        Self {
            global_semaphore: Arc::new(Semaphore::new(config.max_concurrent_requests as usize)),
            frontier: VecDeque::new(),
            seen: HashSet::new(),
            allowed_domains: config.allowed_domains.clone(),
            download_delay: Duration::from_millis(config.download_delay),
            last_dispatch: None,
        }
    }

    /// Adds a request to the back of the frontier
    ///
    /// Requests for hosts outside the allowed domains are rejected. A URL
    /// already scheduled in this run is rejected unless the request sets
    /// `dont_filter`.
    pub fn enqueue(&mut self, request: CrawlRequest) -> Result<(), Rejection> {
        if !is_allowed_domain(&request.url, &self.allowed_domains) {
            tracing::debug!("Filtered off-site request to {}", request.url);
            return Err(Rejection::OffSite);
        }

        let fresh = self.seen.insert(request.url.as_str().to_string());
        if !fresh && !request.dont_filter {
            tracing::trace!("Filtered duplicate request to {}", request.url);
            return Err(Rejection::Duplicate);
        }

        self.frontier.push_back(request);
        Ok(())
    }

    /// Takes the next request to fetch, if one may be dispatched now
    ///
    /// Returns None when the frontier is empty, when the download delay since
    /// the last dispatch has not elapsed, or when every concurrency permit is
    /// in use. Never waits.
    pub fn try_next_request(&mut self) -> Option<ScheduledFetch> {
        if self.frontier.is_empty() || !self.delay_elapsed(Instant::now()) {
            return None;
        }

        let permit = self.global_semaphore.clone().try_acquire_owned().ok()?;
        let request = self.frontier.pop_front()?;
        self.last_dispatch = Some(Instant::now());
        tracing::debug!("Dispatching {} ({})", request.url, request.callback);

        Some(ScheduledFetch { request, permit })
    }

    /// When the next dispatch becomes possible
    ///
    /// None if the frontier is empty or every permit is in use; a permit is
    /// only returned by a finishing fetch, so there is no instant to wait for.
    pub fn next_dispatch_at(&self) -> Option<Instant> {
        if self.frontier.is_empty() || self.global_semaphore.available_permits() == 0 {
            return None;
        }

        Some(match self.last_dispatch {
            Some(last) => last + self.download_delay,
            None => Instant::now(),
        })
    }

    fn delay_elapsed(&self, now: Instant) -> bool {
        self.last_dispatch
            .map_or(true, |last| last + self.download_delay <= now)
    }

    /// Returns the number of requests in the frontier
    pub fn frontier_size(&self) -> usize {
        self.frontier.len()
    }

    /// Returns whether the frontier is empty
    pub fn is_empty(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Returns the number of fetch permits currently free
    pub fn available_permits(&self) -> usize {
        self.global_semaphore.available_permits()
    }
}
