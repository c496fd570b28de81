//! Request, response and output types exchanged between the spider and the engine

use crate::spider::items::Record;
use std::fmt;
use url::Url;

/// Which parser a fetched page is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Callback {
    /// The root tag index page
    TagIndex,

    /// A paginated book listing for one tag
    Listing,

    /// A paginated comment thread for one book
    Comments,
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TagIndex => "tag-index",
            Self::Listing => "listing",
            Self::Comments => "comments",
        };
        f.write_str(name)
    }
}

/// A page the spider wants fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    /// Absolute URL to fetch
    pub url: Url,

    /// Parser the response is routed to
    pub callback: Callback,

    /// Skip the scheduler's duplicate-request filter
    pub dont_filter: bool,

    /// Do not follow redirects; the redirect response itself is returned
    pub dont_redirect: bool,
}

impl CrawlRequest {
    /// Creates a plain request that goes through duplicate filtering and
    /// follows ordinary redirects
    pub fn new(url: Url, callback: Callback) -> Self {
        Self {
            url,
            callback,
            dont_filter: false,
            dont_redirect: false,
        }
    }

    /// Disables redirect following for this request
    pub fn with_dont_redirect(mut self) -> Self {
        self.dont_redirect = true;
        self
    }

    /// Re-issues the request that produced `page`
    ///
    /// The retry keeps the URL and callback, bypasses duplicate filtering
    /// and does not follow redirects, so a repeated block is observed again.
    pub fn retry(page: &FetchedPage) -> Self {
        Self {
            url: page.url.clone(),
            callback: page.callback,
            dont_filter: true,
            dont_redirect: true,
        }
    }
}

/// A fetched page handed to the spider
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL of the response (after any followed redirects)
    pub url: Url,

    /// HTTP status code
    pub status: u16,

    /// Response body
    pub body: String,

    /// Parser this page is routed to
    pub callback: Callback,
}

/// One item produced by parsing a page
#[derive(Debug, Clone, PartialEq)]
pub enum SpiderOutput {
    /// A follow-up page to fetch
    Request(CrawlRequest),

    /// An extracted record to persist
    Record(Record),
}

impl SpiderOutput {
    /// Returns the request, if this output is one
    pub fn as_request(&self) -> Option<&CrawlRequest> {
        match self {
            Self::Request(request) => Some(request),
            Self::Record(_) => None,
        }
    }

    /// Returns the record, if this output is one
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            Self::Request(_) => None,
        }
    }
}

impl From<CrawlRequest> for SpiderOutput {
    fn from(request: CrawlRequest) -> Self {
        Self::Request(request)
    }
}

impl From<Record> for SpiderOutput {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(status: u16) -> FetchedPage {
        FetchedPage {
            url: Url::parse("http://book.douban.com/tag/小说").unwrap(),
            status,
            body: String::new(),
            callback: Callback::Listing,
        }
    }

    #[test]
    fn test_new_request_defaults() {
        let url = Url::parse("http://book.douban.com/tag/").unwrap();
        let request = CrawlRequest::new(url.clone(), Callback::TagIndex);
        assert_eq!(request.url, url);
        assert!(!request.dont_filter);
        assert!(!request.dont_redirect);
        assert!(request.with_dont_redirect().dont_redirect);
    }

    #[test]
    fn test_retry_keeps_url_and_callback() {
        let blocked = page(403);
        let retry = CrawlRequest::retry(&blocked);
        assert_eq!(retry.url, blocked.url);
        assert_eq!(retry.callback, Callback::Listing);
        assert!(retry.dont_filter);
        assert!(retry.dont_redirect);
    }

    #[test]
    fn test_callback_display() {
        assert_eq!(Callback::TagIndex.to_string(), "tag-index");
        assert_eq!(Callback::Comments.to_string(), "comments");
    }
}
