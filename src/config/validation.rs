use crate::config::types::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_http_url("start-url", &config.start_url)?;
    validate_http_url("base-url", &config.base_url)?;

    if config.allowed_domains.is_empty() {
        return Err(ConfigError::Validation(
            "allowed-domains must list at least one domain".to_string(),
        ));
    }
    for pattern in &config.allowed_domains {
        validate_domain_pattern(pattern)?;
    }

    for code in &config.blocked_status_codes {
        if !(100..=599).contains(code) {
            return Err(ConfigError::Validation(format!(
                "blocked-status-codes must be valid HTTP statuses, got {}",
                code
            )));
        }
    }

    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    Ok(())
}

/// Validates that a configured URL parses and uses an HTTP(S) scheme
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);

    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::Validation(format!("Invalid email format: '{}'", email));

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(invalid());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crawler_config() -> CrawlerConfig {
        CrawlerConfig {
            start_url: "http://book.douban.com/tag/".to_string(),
            base_url: "http://book.douban.com".to_string(),
            allowed_domains: vec!["book.douban.com".to_string()],
            debug: false,
            blocked_status_codes: vec![302, 403],
            max_concurrent_requests: 8,
            download_delay: 2000,
        }
    }

    #[test]
    fn test_validate_domain_pattern() {
        assert!(validate_domain_pattern("book.douban.com").is_ok());
        assert!(validate_domain_pattern("*.douban.com").is_ok());
        assert!(validate_domain_pattern("localhost").is_ok());
        assert!(validate_domain_pattern("127.0.0.1").is_ok());

        assert!(validate_domain_pattern("").is_err());
        assert!(validate_domain_pattern("*.").is_err());
        assert!(validate_domain_pattern(".douban.com").is_err());
        assert!(validate_domain_pattern("douban.com.").is_err());
        assert!(validate_domain_pattern("douban..com").is_err());
        assert!(validate_domain_pattern("dou ban.com").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
        assert!(validate_email("a@b@example.com").is_err());
    }

    #[test]
    fn test_valid_crawler_config() {
        assert!(validate_crawler_config(&crawler_config()).is_ok());
    }

    #[test]
    fn test_start_url_must_be_http() {
        let mut config = crawler_config();
        config.start_url = "ftp://book.douban.com/tag/".to_string();
        assert!(matches!(
            validate_crawler_config(&config),
            Err(ConfigError::Validation(_))
        ));

        config.start_url = "not a url".to_string();
        assert!(matches!(
            validate_crawler_config(&config),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_blocked_status_codes_range() {
        let mut config = crawler_config();
        config.blocked_status_codes = vec![302, 42];
        assert!(validate_crawler_config(&config).is_err());

        config.blocked_status_codes = vec![];
        assert!(validate_crawler_config(&config).is_ok());
    }

    #[test]
    fn test_allowed_domains_required() {
        let mut config = crawler_config();
        config.allowed_domains.clear();
        assert!(validate_crawler_config(&config).is_err());
    }

    #[test]
    fn test_concurrency_bounds() {
        let mut config = crawler_config();
        config.max_concurrent_requests = 101;
        assert!(validate_crawler_config(&config).is_err());
    }
}
