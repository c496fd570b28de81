//! Tag index parsing
//!
//! The tag index lists every category in a table; each category link leads
//! to a paginated book listing.

use crate::spider::html::{attr, select_all};
use crate::spider::request::{Callback, CrawlRequest, FetchedPage, SpiderOutput};
use crate::spider::shuffle::Shuffler;
use crate::spider::SpiderSettings;
use crate::url::resolve_link;
use scraper::Html;

const TAG_LINK_SELECTOR: &str = "table.tagCol > tbody > tr > td > a";

/// Parses the tag index into one listing request per category
///
/// Category URLs are resolved against the start URL and emitted in the order
/// produced by `shuffler`. In debug mode only the first one is emitted.
pub fn parse_tag_index(
    page: &FetchedPage,
    settings: &SpiderSettings,
    shuffler: &mut dyn Shuffler,
) -> Vec<SpiderOutput> {
    let document = Html::parse_document(&page.body);

    let mut tags: Vec<_> = select_all(&document, TAG_LINK_SELECTOR)
        .into_iter()
        .filter_map(|link| attr(link, "href"))
        .filter_map(|href| {
            let resolved = resolve_link(&href, &settings.start_url);
            if resolved.is_none() {
                tracing::debug!("Skipping unusable tag link: {}", href);
            }
            resolved
        })
        .collect();

    tracing::info!("Found {} tag categories on {}", tags.len(), page.url);
    shuffler.shuffle(&mut tags);

    let limit = if settings.debug { 1 } else { tags.len() };
    tags.into_iter()
        .take(limit)
        .map(|url| CrawlRequest::new(url, Callback::Listing).into())
        .collect()
}
