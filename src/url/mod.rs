//! URL handling module
//!
//! This module provides link resolution, allowed-domain matching and the
//! book id conventions of the site's URL layout.

mod book;
mod domain;
mod resolve;

pub use book::{book_id_from_comments_url, book_id_from_detail_url, comments_url};
pub use domain::{extract_domain, is_allowed_domain, matches_wildcard};
pub use resolve::resolve_link;
