//! Site-specific crawl logic
//!
//! The spider turns fetched pages into follow-up requests and records. It
//! knows three kinds of pages:
//!
//! - the tag index, which links to every category listing
//! - category listings, which carry book metadata and link to comment threads
//! - comment threads, which carry user ratings
//!
//! Blocked responses are caught before any parser sees them and turned into a
//! retry of the same request.

mod ban;
mod comments;
mod discovery;
mod html;
mod items;
mod listing;
mod request;
mod shuffle;

pub use ban::BanDetector;
pub use comments::{parse_comments, rating_from_class};
pub use discovery::parse_tag_index;
pub use items::{BookRecord, CommentRecord, Record};
pub use listing::parse_listing;
pub use request::{Callback, CrawlRequest, FetchedPage, SpiderOutput};
pub use shuffle::{NoShuffle, RandomShuffler, Shuffler};

use crate::config::CrawlerConfig;
use crate::storage::VisitedStore;
use url::Url;

/// Static parameters shared by all parsers
#[derive(Debug, Clone)]
pub struct SpiderSettings {
    /// The tag index URL; category links are resolved against it
    pub start_url: Url,

    /// Site root; listing pagination links are resolved against it
    pub base_url: Url,

    /// Limits the crawl to a single path through the site
    pub debug: bool,
}

impl SpiderSettings {
    pub fn new(start_url: Url, base_url: Url, debug: bool) -> Self {
        Self {
            start_url,
            base_url,
            debug,
        }
    }

    /// Builds settings from the `[crawler]` config section
    pub fn from_config(config: &CrawlerConfig) -> crate::Result<Self> {
        Ok(Self::new(
            Url::parse(&config.start_url)?,
            Url::parse(&config.base_url)?,
            config.debug,
        ))
    }
}

/// Records the page as visited and reports whether it already was
///
/// A store failure is logged and the page is treated as new, so its records
/// are extracted again rather than lost.
pub(crate) fn already_visited(visited: &mut dyn VisitedStore, page: &FetchedPage) -> bool {
    match visited.mark_visited(page.url.as_str()) {
        Ok(newly_recorded) => {
            if !newly_recorded {
                tracing::debug!("Already scraped {}, skipping extraction", page.url);
            }
            !newly_recorded
        }
        Err(e) => {
            tracing::error!("Failed to record visit to {}: {}", page.url, e);
            false
        }
    }
}

/// The book spider
///
/// Owns the visited store and the category shuffler; all parsing happens
/// through [`BookSpider::parse`], one page at a time.
pub struct BookSpider {
    settings: SpiderSettings,
    ban: BanDetector,
    visited: Box<dyn VisitedStore>,
    shuffler: Box<dyn Shuffler>,
}

impl BookSpider {
    pub fn new(
        settings: SpiderSettings,
        ban: BanDetector,
        visited: Box<dyn VisitedStore>,
        shuffler: Box<dyn Shuffler>,
    ) -> Self {
        Self {
            settings,
            ban,
            visited,
            shuffler,
        }
    }

    /// Returns true if a response with this status is a block
    pub fn is_blocked(&self, status: u16) -> bool {
        self.ban.is_banned(status)
    }

    /// Number of pages recorded as visited
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// The initial request for the tag index
    ///
    /// Redirects are not followed so a bounce on the very first page is seen
    /// by the ban check.
    pub fn start_request(&self) -> CrawlRequest {
        CrawlRequest::new(self.settings.start_url.clone(), Callback::TagIndex).with_dont_redirect()
    }

    /// Parses a fetched page
    ///
    /// A blocked page yields exactly one output: the retry request.
    pub fn parse(&mut self, page: &FetchedPage) -> Vec<SpiderOutput> {
        if let Some(retry) = self.ban.check(page) {
            return vec![retry.into()];
        }

        match page.callback {
            Callback::TagIndex => {
                parse_tag_index(page, &self.settings, self.shuffler.as_mut())
            }
            Callback::Listing => parse_listing(page, &self.settings, self.visited.as_mut()),
            Callback::Comments => parse_comments(page, &self.settings, self.visited.as_mut()),
        }
    }
}
