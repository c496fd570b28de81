//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - Redirect handling, with blocked statuses surfaced instead of followed
//! - Error classification

use crate::config::UserAgentConfig;
use crate::spider::{CrawlRequest, FetchedPage};
use reqwest::{redirect::Policy, Client};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Maximum redirect hops followed for a single request
pub const MAX_REDIRECTS: usize = 10;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// A response the spider should see: a success or a blocked status
    Page(FetchedPage),

    /// Any other HTTP status; the response is dropped
    UnexpectedStatus {
        /// The requested URL
        url: String,
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, redirect loop, etc.)
    NetworkError {
        /// The requested URL
        url: String,
        /// Error description
        error: String,
    },
}

/// Formats the user agent header value
///
/// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `policy` - How redirects are handled
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use doubook_crawler::config::UserAgentConfig;
/// use doubook_crawler::crawler::build_http_client;
/// use reqwest::redirect::Policy;
///
/// let config = UserAgentConfig {
///     crawler_name: "doubook-crawler".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Policy::none()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig, policy: Policy) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(policy)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Follows up to [`MAX_REDIRECTS`] hops but stops on a blocked status
///
/// A stopped redirect is returned as the response itself, so a bounce to the
/// verification page reaches the ban check.
fn stop_on_blocked(blocked: Arc<HashSet<u16>>) -> Policy {
    Policy::custom(move |attempt| {
        if blocked.contains(&attempt.status().as_u16()) {
            attempt.stop()
        } else if attempt.previous().len() >= MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else {
            attempt.follow()
        }
    })
}

/// Fetches pages for the crawler
///
/// Cloning is cheap; clones share the underlying connection pools.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    no_redirect_client: Client,
    blocked: Arc<HashSet<u16>>,
}

impl Fetcher {
    /// Creates a fetcher for the given user agent and blocked statuses
    pub fn new(
        config: &UserAgentConfig,
        blocked: impl IntoIterator<Item = u16>,
    ) -> Result<Self, reqwest::Error> {
        let blocked: Arc<HashSet<u16>> = Arc::new(blocked.into_iter().collect());
        Ok(Self {
            client: build_http_client(config, stop_on_blocked(blocked.clone()))?,
            no_redirect_client: build_http_client(config, Policy::none())?,
            blocked,
        })
    }

    /// Fetches a request
    ///
    /// # Request Flow
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 2xx | `Page` |
    /// | Blocked status (302, 403 by default) | `Page`, for the ban check |
    /// | Any other status | `UnexpectedStatus` |
    /// | Timeout, connection error, redirect loop | `NetworkError` |
    ///
    /// Requests marked `dont_redirect` never follow redirects.
    pub async fn fetch(&self, request: &CrawlRequest) -> FetchResult {
        let client = if request.dont_redirect {
            &self.no_redirect_client
        } else {
            &self.client
        };

        let response = match client.get(request.url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return network_error(request, e),
        };

        let status = response.status();
        let status_code = status.as_u16();
        let final_url = response.url().clone();

        if !status.is_success() && !self.blocked.contains(&status_code) {
            return FetchResult::UnexpectedStatus {
                url: request.url.to_string(),
                status_code,
            };
        }

        match response.text().await {
            Ok(body) => FetchResult::Page(FetchedPage {
                url: final_url,
                status: status_code,
                body,
                callback: request.callback,
            }),
            Err(e) => network_error(request, e),
        }
    }
}

fn network_error(request: &CrawlRequest, e: reqwest::Error) -> FetchResult {
    let error = if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        "Connection refused".to_string()
    } else if e.is_redirect() {
        format!("Redirect error: {}", e)
    } else {
        e.to_string()
    };

    FetchResult::NetworkError {
        url: request.url.to_string(),
        error,
    }
}
