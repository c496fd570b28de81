//! Tag listing parsing
//!
//! A listing page shows up to 20 books of one tag plus a paginator. Book
//! metadata is extracted once per listing page, but the comment thread of
//! every listed book is requested on every pass because comments keep growing.

use crate::spider::html::{
    attr, children, children_with_class, first_child, first_child_with_class, own_text,
    select_all,
};
use crate::spider::items::{BookRecord, Record};
use crate::spider::request::{Callback, CrawlRequest, FetchedPage, SpiderOutput};
use crate::spider::{already_visited, SpiderSettings};
use crate::storage::VisitedStore;
use crate::url::{book_id_from_detail_url, comments_url, resolve_link};
use scraper::{ElementRef, Html};
use url::Url;

const BOOK_SELECTOR: &str = "ul > li.subject-item > div.info";
const PAGINATOR_SELECTOR: &str = "div.paginator";

/// Fields of one listing entry, as found in the markup
#[derive(Debug, Default)]
struct BookEntry {
    url: Option<Url>,
    title: Option<String>,
    publication: Option<String>,
    rating: Option<String>,
}

impl BookEntry {
    /// Reads an entry from its `div.info` block
    fn extract(info: ElementRef<'_>, page_url: &Url) -> Self {
        let link = first_child(info, "h2").and_then(|h2| first_child(h2, "a"));

        let url = link
            .and_then(|a| attr(a, "href"))
            .and_then(|href| resolve_link(&href, page_url));
        let title = link.and_then(own_text);
        let publication = first_child_with_class(info, "div", "pub").and_then(own_text);
        let rating = children(info, "div")
            .flat_map(|div| children_with_class(div, "span", "rating_nums"))
            .find_map(own_text);

        Self {
            url,
            title,
            publication,
            rating,
        }
    }

    /// Names of the required fields that are absent
    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.url.is_none() {
            missing.push("url");
        }
        if self.title.is_none() {
            missing.push("title");
        }
        if self.publication.is_none() {
            missing.push("pub");
        }
        if self.rating.is_none() {
            missing.push("rating");
        }
        missing
    }

    /// Builds the book record, or explains why the entry is unusable
    fn to_record(&self) -> Result<BookRecord, String> {
        let missing = self.missing_fields();
        let (Some(url), Some(title), Some(publication), Some(rating)) = (
            &self.url,
            &self.title,
            &self.publication,
            &self.rating,
        ) else {
            return Err(format!("missing {}", missing.join(", ")));
        };

        let id = book_id_from_detail_url(url).map_err(|e| e.to_string())?;
        let rating = rating
            .parse::<f64>()
            .map_err(|_| format!("rating '{}' is not a number", rating))?;
        let author = publication
            .split('/')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();

        Ok(BookRecord {
            id,
            title: title.trim().to_string(),
            author,
            rating,
        })
    }
}

/// Parses a tag listing page
///
/// Outputs, in order: for each entry, its book record (first visit of the
/// page only) and its comment thread request; then the next listing page.
/// Entries without a detail link produce nothing.
pub fn parse_listing(
    page: &FetchedPage,
    settings: &SpiderSettings,
    visited: &mut dyn VisitedStore,
) -> Vec<SpiderOutput> {
    let page_crawled = already_visited(visited, page);
    let document = Html::parse_document(&page.body);
    let mut outputs = Vec::new();

    for info in select_all(&document, BOOK_SELECTOR) {
        let entry = BookEntry::extract(info, &page.url);

        let Some(detail_url) = entry.url.as_ref() else {
            tracing::warn!("Book entry without a detail link on {}, ignoring", page.url);
            continue;
        };

        if !page_crawled {
            match entry.to_record() {
                Ok(book) => outputs.push(Record::from(book).into()),
                Err(reason) => {
                    tracing::warn!("Bad data for book {} ({}), ignoring", detail_url, reason)
                }
            }
        }

        match comments_url(detail_url) {
            Ok(url) => outputs.push(CrawlRequest::new(url, Callback::Comments).into()),
            Err(e) => tracing::warn!("Cannot build comments URL for {}: {}", detail_url, e),
        }

        if settings.debug {
            break;
        }
    }

    if let Some(next_url) = next_listing_page(&document, page, settings) {
        if !settings.debug {
            outputs.push(CrawlRequest::new(next_url, Callback::Listing).into());
        }
    }

    outputs
}

/// Finds the paginator's "next" link, resolved against the site base URL
fn next_listing_page(
    document: &Html,
    page: &FetchedPage,
    settings: &SpiderSettings,
) -> Option<Url> {
    let Some(paginator) = select_all(document, PAGINATOR_SELECTOR).into_iter().next() else {
        tracing::info!("No more pages after {}", page.url);
        return None;
    };

    let href = children_with_class(paginator, "span", "next")
        .filter_map(|span| first_child(span, "a"))
        .find_map(|a| attr(a, "href"));

    match href {
        Some(href) => resolve_link(&href, &settings.base_url),
        None => {
            tracing::info!("Last listing page reached at {}", page.url);
            None
        }
    }
}
