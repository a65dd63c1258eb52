//! Stable CSS selector generation for elements.
//!
//! The generated selector re-resolves to the same element for as long as
//! the tree is not structurally mutated.

use crate::dom::Element;
use regex::Regex;
use std::sync::LazyLock;

static CSS_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[_a-zA-Z][_a-zA-Z0-9-]*$").expect("static regex"));

/// Whether `value` can be written as a bare CSS identifier
#[must_use]
pub fn is_css_identifier(value: &str) -> bool {
    CSS_IDENT.is_match(value)
}

/// Generate a selector that resolves back to `element`.
///
/// Prefers `#id` when the id is unique in the document. Otherwise builds a
/// child-combinator path from `body` (or `html` for head content) of
/// `tag.class[:nth-child(n)]` segments.
#[must_use]
pub fn generate_selector(element: &Element<'_>) -> String {
    if let Some(id) = unique_id(element) {
        return format!("#{id}");
    }

    let mut segments = Vec::new();
    let mut current = Some(*element);
    while let Some(el) = current {
        let name = el.local_name();
        if name == "body" || name == "html" {
            segments.push(name.to_string());
            break;
        }
        segments.push(segment_for(&el));
        current = el.parent_element();
    }

    segments.reverse();
    segments.join(" > ")
}

fn unique_id<'a>(element: &Element<'a>) -> Option<&'a str> {
    let id = element.id().filter(|id| is_css_identifier(id))?;
    let matches = element
        .document()
        .query_selector_all(&format!("#{id}"))
        .ok()?;
    (matches.len() == 1).then_some(id)
}

fn segment_for(element: &Element<'_>) -> String {
    let mut segment = element.local_name().to_string();
    for class in element.classes().filter(|c| is_css_identifier(c)) {
        segment.push('.');
        segment.push_str(class);
    }
    if element.has_same_tag_sibling() {
        segment.push_str(&format!(":nth-child({})", element.index_among_siblings()));
    }
    segment
}
