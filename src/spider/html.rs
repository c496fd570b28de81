//! Small DOM helpers over `scraper`
//!
//! Page blocks are located with CSS selectors; fields inside a block are read
//! by walking direct children, so `h2 > a` inside a block never picks up an
//! anchor nested deeper in the markup.

use scraper::{ElementRef, Html, Selector};

/// Selects every element in the document matching `css`
pub fn select_all<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).collect(),
        Err(e) => {
            tracing::error!("Invalid selector '{}': {:?}", css, e);
            Vec::new()
        }
    }
}

/// Returns true if the element carries the given class
pub fn has_class(element: &ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// Iterates the direct element children with the given tag name
pub fn children<'a>(
    element: ElementRef<'a>,
    tag: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == tag)
}

/// Iterates the direct children with the given tag name and class
pub fn children_with_class<'a>(
    element: ElementRef<'a>,
    tag: &'a str,
    class: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    children(element, tag).filter(move |child| has_class(child, class))
}

/// First direct child with the given tag name
pub fn first_child<'a>(element: ElementRef<'a>, tag: &'a str) -> Option<ElementRef<'a>> {
    children(element, tag).next()
}

/// First direct child with the given tag name and class
pub fn first_child_with_class<'a>(
    element: ElementRef<'a>,
    tag: &'a str,
    class: &'a str,
) -> Option<ElementRef<'a>> {
    children_with_class(element, tag, class).next()
}

/// First non-blank text node directly inside the element, trimmed
///
/// Text of nested elements is not included.
pub fn own_text(element: ElementRef<'_>) -> Option<String> {
    element
        .children()
        .filter_map(|node| node.value().as_text())
        .map(|text| text.trim())
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

/// Value of an attribute, if present and not blank
pub fn attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
