//! Detection of blocked or bounced responses
//!
//! The site answers aggressive crawlers with a redirect to a verification page
//! or a plain 403. Such responses carry no data; the page is requested again
//! with the same callback until a real response arrives.

use crate::spider::request::{CrawlRequest, FetchedPage};
use std::collections::HashSet;

/// Classifies response statuses as blocked
#[derive(Debug, Clone)]
pub struct BanDetector {
    blocked: HashSet<u16>,
}

impl BanDetector {
    /// Creates a detector for the given blocked statuses
    pub fn new(blocked: impl IntoIterator<Item = u16>) -> Self {
        Self {
            blocked: blocked.into_iter().collect(),
        }
    }

    /// Returns true if the status means the crawler was blocked
    pub fn is_banned(&self, status: u16) -> bool {
        self.blocked.contains(&status)
    }

    /// Returns the retry request for a blocked page, or None if it is not blocked
    ///
    /// No retry count is kept: a permanently blocked URL is retried forever.
    pub fn check(&self, page: &FetchedPage) -> Option<CrawlRequest> {
        if !self.is_banned(page.status) {
            return None;
        }

        tracing::warn!(
            "Blocked with HTTP {} on {} ({}), retrying",
            page.status,
            page.url,
            page.callback
        );
        Some(CrawlRequest::retry(page))
    }
}

impl Default for BanDetector {
    fn default() -> Self {
        Self::new(crate::config::default_blocked_status_codes())
    }
}
