use serde::Deserialize;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Tag index page the crawl starts from
    #[serde(rename = "start-url", default = "default_start_url")]
    pub start_url: String,

    /// Site root used to resolve listing pagination links
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Host patterns requests may target (e.g. "book.douban.com" or "*.douban.com")
    #[serde(rename = "allowed-domains", default = "default_allowed_domains")]
    pub allowed_domains: Vec<String>,

    /// Limited mode: one item per page and no pagination
    #[serde(default)]
    pub debug: bool,

    /// Response statuses that mean the crawler was blocked or bounced
    #[serde(
        rename = "blocked-status-codes",
        default = "default_blocked_status_codes"
    )]
    pub blocked_status_codes: Vec<u16>,

    /// Maximum number of fetches in flight
    #[serde(
        rename = "max-concurrent-requests",
        default = "default_max_concurrent_requests"
    )]
    pub max_concurrent_requests: u32,

    /// Minimum time between two dispatched requests (milliseconds)
    #[serde(rename = "download-delay", default = "default_download_delay")]
    pub download_delay: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            start_url: default_start_url(),
            base_url: default_base_url(),
            allowed_domains: default_allowed_domains(),
            debug: false,
            blocked_status_codes: default_blocked_status_codes(),
            max_concurrent_requests: default_max_concurrent_requests(),
            download_delay: default_download_delay(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_start_url() -> String {
    "http://book.douban.com/tag/".to_string()
}

fn default_base_url() -> String {
    "http://book.douban.com".to_string()
}

fn default_allowed_domains() -> Vec<String> {
    vec!["book.douban.com".to_string()]
}

pub(crate) fn default_blocked_status_codes() -> Vec<u16> {
    vec![302, 403]
}

fn default_max_concurrent_requests() -> u32 {
    8
}

fn default_download_delay() -> u64 {
    2000
}
