//! Crawler module for page fetching and crawl orchestration
//!
//! This module contains the crawl engine, including:
//! - HTTP fetching with redirect and block handling
//! - Request scheduling and rate limiting
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod scheduler;

pub use coordinator::{interrupt_listener, run_crawl, Coordinator};
pub use fetcher::{build_http_client, user_agent_string, FetchResult, Fetcher, MAX_REDIRECTS};
pub use scheduler::{Rejection, ScheduledFetch, Scheduler};
