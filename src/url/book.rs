//! Book identifiers and per-book URLs
//!
//! Douban book pages live at `/subject/<id>/`, and each book's comment thread
//! at `/subject/<id>/comments/`.

use crate::{UrlError, UrlResult};
use url::Url;

/// Derives a book id from its detail page URL
///
/// The id is the last path segment once a single trailing slash is removed.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use doubook_crawler::url::book_id_from_detail_url;
///
/// let url = Url::parse("https://book.douban.com/subject/12345/").unwrap();
/// assert_eq!(book_id_from_detail_url(&url).unwrap(), 12345);
/// ```
pub fn book_id_from_detail_url(url: &Url) -> UrlResult<i64> {
    let path = url.path();
    let path = path.strip_suffix('/').unwrap_or(path);
    let segment = path.rsplit('/').next().unwrap_or_default();
    parse_book_id(url, segment)
}

/// Derives a book id from a comment page URL
///
/// The id is the third `/`-separated piece of the path, counting the empty
/// piece before the leading slash: `/subject/<id>/comments/`.
pub fn book_id_from_comments_url(url: &Url) -> UrlResult<i64> {
    let segment = url
        .path()
        .split('/')
        .nth(2)
        .ok_or_else(|| UrlError::MissingSegment {
            url: url.to_string(),
            index: 2,
        })?;
    parse_book_id(url, segment)
}

/// Builds the comment thread URL for a book detail page
///
/// A detail URL without a trailing slash is treated as a directory, so
/// `/subject/1` and `/subject/1/` both map to `/subject/1/comments/`.
pub fn comments_url(detail: &Url) -> UrlResult<Url> {
    let mut base = detail.clone();
    base.set_query(None);
    base.set_fragment(None);
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    base.join("comments/")
        .map_err(|e| UrlError::Parse(format!("{}: {}", detail, e)))
}

fn parse_book_id(url: &Url, segment: &str) -> UrlResult<i64> {
    segment
        .parse::<i64>()
        .map_err(|_| UrlError::InvalidBookId {
            url: url.to_string(),
            segment: segment.to_string(),
        })
}
