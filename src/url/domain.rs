use url::Url;

/// Extracts the lowercase host of a URL, if it has one
///
/// # Examples
///
/// ```
/// use url::Url;
/// use doubook_crawler::url::extract_domain;
///
/// let url = Url::parse("http://Book.Douban.com/tag/").unwrap();
/// assert_eq!(extract_domain(&url), Some("book.douban.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks if a domain matches a wildcard pattern
///
/// Two kinds of pattern are supported:
/// 1. Exact match: "book.douban.com" matches only "book.douban.com"
/// 2. Wildcard match: "*.douban.com" matches "douban.com" and any subdomain of it
///
/// # Examples
///
/// ```
/// use doubook_crawler::url::matches_wildcard;
///
/// assert!(matches_wildcard("book.douban.com", "book.douban.com"));
/// assert!(matches_wildcard("*.douban.com", "book.douban.com"));
/// assert!(matches_wildcard("*.douban.com", "douban.com"));
/// assert!(!matches_wildcard("*.douban.com", "notdouban.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// Returns true if the URL's host matches any of the allowed domain patterns
///
/// URLs without a host are never allowed.
pub fn is_allowed_domain(url: &Url, allowed: &[String]) -> bool {
    match extract_domain(url) {
        Some(domain) => allowed
            .iter()
            .any(|pattern| matches_wildcard(&pattern.to_lowercase(), &domain)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec!["book.douban.com".to_string(), "*.doubanio.com".to_string()]
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("http://127.0.0.1:8080/tag/").unwrap();
        assert_eq!(extract_domain(&url), Some("127.0.0.1".to_string()));
    }

    #[test]
    fn test_extract_without_host() {
        let url = Url::parse("data:text/plain,hello").unwrap();
        assert_eq!(extract_domain(&url), None);
    }

    #[test]
    fn test_exact_pattern() {
        assert!(matches_wildcard("book.douban.com", "book.douban.com"));
        assert!(!matches_wildcard("book.douban.com", "movie.douban.com"));
        assert!(!matches_wildcard("book.douban.com", "douban.com"));
    }

    #[test]
    fn test_wildcard_pattern() {
        assert!(matches_wildcard("*.douban.com", "douban.com"));
        assert!(matches_wildcard("*.douban.com", "book.douban.com"));
        assert!(matches_wildcard("*.douban.com", "img1.book.douban.com"));
        assert!(!matches_wildcard("*.douban.com", "mydouban.com"));
        assert!(!matches_wildcard("*.douban.com", "douban.com.cn"));
    }

    #[test]
    fn test_allowed_domain() {
        let url = Url::parse("http://book.douban.com/subject/1/").unwrap();
        assert!(is_allowed_domain(&url, &allowed()));

        let url = Url::parse("https://img3.doubanio.com/cover.jpg").unwrap();
        assert!(is_allowed_domain(&url, &allowed()));
    }

    #[test]
    fn test_offsite_domain_rejected() {
        let url = Url::parse("http://movie.douban.com/subject/1/").unwrap();
        assert!(!is_allowed_domain(&url, &allowed()));

        let url = Url::parse("http://www.example.com/").unwrap();
        assert!(!is_allowed_domain(&url, &allowed()));
    }

    #[test]
    fn test_allowed_domain_case_insensitive() {
        let url = Url::parse("http://BOOK.DOUBAN.COM/tag/").unwrap();
        assert!(is_allowed_domain(&url, &["Book.Douban.com".to_string()]));
    }
}
