//! Comment thread parsing
//!
//! Each comment header carries the "useful" vote count, the commenter's name
//! and a star widget whose CSS class encodes the rating (`allstar50` is five
//! stars, `allstar10` one star).

use crate::spider::html::{attr, children, first_child, first_child_with_class, own_text, select_all};
use crate::spider::items::{CommentRecord, Record};
use crate::spider::request::{Callback, CrawlRequest, FetchedPage, SpiderOutput};
use crate::spider::{already_visited, SpiderSettings};
use crate::storage::VisitedStore;
use crate::url::{book_id_from_comments_url, resolve_link};
use scraper::{ElementRef, Html};
use url::Url;

const COMMENT_SELECTOR: &str = "ul > li.comment-item > h3";
const PAGINATOR_SELECTOR: &str = "ul.comment-paginator";

/// Position of the "next" entry in the comment paginator
///
/// The pager is `first | prev | next` without any marker class on the last one.
const NEXT_ITEM_INDEX: usize = 2;

/// Maps a star-widget class token to a rating, 0 when unknown
pub fn rating_from_class(token: &str) -> u8 {
    match token {
        "allstar50" => 5,
        "allstar40" => 4,
        "allstar30" => 3,
        "allstar20" => 2,
        "allstar10" => 1,
        _ => 0,
    }
}

/// Strips the decorative classes from a star widget's class attribute
fn rating_token(class_attr: &str) -> String {
    class_attr
        .replace("user-stars", "")
        .replace("rating", "")
        .trim()
        .to_string()
}

/// Fields of one comment header
#[derive(Debug, Default)]
struct CommentEntry {
    vote: Option<String>,
    user: Option<String>,
    rating_class: Option<String>,
}

impl CommentEntry {
    fn extract(header: ElementRef<'_>) -> Self {
        let vote = first_child_with_class(header, "span", "comment-vote")
            .and_then(|span| first_child(span, "span"))
            .and_then(own_text);

        let info = first_child_with_class(header, "span", "comment-info");
        let user = info.and_then(|i| first_child(i, "a")).and_then(own_text);
        let rating_class = info
            .and_then(|i| first_child(i, "span"))
            .and_then(|span| attr(span, "class"));

        Self {
            vote,
            user,
            rating_class,
        }
    }
}

/// Parses one page of a book's comment thread
///
/// Comments are extracted only the first time the page is seen; the next
/// page of the thread is requested either way (except in debug mode).
pub fn parse_comments(
    page: &FetchedPage,
    settings: &SpiderSettings,
    visited: &mut dyn VisitedStore,
) -> Vec<SpiderOutput> {
    let page_crawled = already_visited(visited, page);
    let document = Html::parse_document(&page.body);
    let mut outputs = Vec::new();

    if !page_crawled {
        extract_comments(&document, page, settings, &mut outputs);
    }

    if let Some(next_url) = next_comment_page(&document, &page.url) {
        if !settings.debug {
            outputs.push(CrawlRequest::new(next_url, Callback::Comments).into());
        }
    }

    outputs
}

fn extract_comments(
    document: &Html,
    page: &FetchedPage,
    settings: &SpiderSettings,
    outputs: &mut Vec<SpiderOutput>,
) {
    let book_id = match book_id_from_comments_url(&page.url) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Cannot tell which book {} belongs to: {}", page.url, e);
            return;
        }
    };

    for header in select_all(document, COMMENT_SELECTOR) {
        let entry = CommentEntry::extract(header);
        let (Some(vote), Some(user), Some(rating_class)) =
            (entry.vote, entry.user, entry.rating_class)
        else {
            tracing::warn!("Bad data for comment on book {}, ignoring", book_id);
            continue;
        };

        let Ok(vote) = vote.parse::<u32>() else {
            tracing::warn!("Bad vote count '{}' on book {}, ignoring", vote, book_id);
            continue;
        };

        let token = rating_token(&rating_class);
        let rating = rating_from_class(&token);
        if rating == 0 {
            tracing::info!("Bad rating '{}' for comment on book {}, ignoring", token, book_id);
            continue;
        }

        outputs.push(
            Record::from(CommentRecord {
                book_id,
                user,
                rating,
                vote,
            })
            .into(),
        );

        if settings.debug {
            break;
        }
    }
}

/// Third item of the comment paginator, resolved against the page URL
fn next_comment_page(document: &Html, page_url: &Url) -> Option<Url> {
    select_all(document, PAGINATOR_SELECTOR)
        .into_iter()
        .filter_map(|pager| children(pager, "li").nth(NEXT_ITEM_INDEX))
        .filter_map(|item| first_child(item, "a"))
        .find_map(|a| attr(a, "href"))
        .and_then(|href| resolve_link(&href, page_url))
}
