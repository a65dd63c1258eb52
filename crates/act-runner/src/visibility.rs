//! Visibility and viewport metrics for elements.

use crate::dom::Element;

/// Whether the element is rendered and perceivable.
///
/// False when the element sits in a `display: none` subtree, computes to
/// `visibility: hidden | collapse`, has zero opacity, or has an empty box.
#[must_use]
pub fn is_element_visible(element: &Element<'_>) -> bool {
    let style = element.computed_style();
    if style.display == "none" || element.in_display_none_subtree() {
        return false;
    }
    if style.visibility == "hidden" || style.visibility == "collapse" {
        return false;
    }
    if style.opacity <= 0.0 {
        return false;
    }
    !element.bounding_client_rect().is_empty()
}

/// Whether the element's box lies entirely inside the viewport
#[must_use]
pub fn is_in_viewport(element: &Element<'_>) -> bool {
    let rect = element.bounding_client_rect();
    let viewport = element.document().viewport();
    rect.top() >= 0.0
        && rect.left() >= 0.0
        && rect.bottom() <= viewport.height
        && rect.right() <= viewport.width
}

/// Whether any part of the element's box overlaps the viewport
#[must_use]
pub fn is_partially_in_viewport(element: &Element<'_>) -> bool {
    let rect = element.bounding_client_rect();
    let viewport = element.document().viewport();
    rect.top() < viewport.height
        && rect.bottom() > 0.0
        && rect.left() < viewport.width
        && rect.right() > 0.0
}

/// Fraction of the element's box area inside the viewport, in `[0, 1]`.
///
/// Returns 0 for invisible elements and for elements with zero area.
#[must_use]
pub fn get_visibility_ratio(element: &Element<'_>) -> f64 {
    if !is_element_visible(element) {
        return 0.0;
    }
    let rect = element.bounding_client_rect();
    let area = rect.area();
    if area <= 0.0 {
        return 0.0;
    }
    rect.intersection(&element.document().viewport().as_rect())
        .map_or(0.0, |overlap| (overlap.area() / area).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{BoundingBox, Document};

    fn page() -> Document {
        let mut doc = Document::parse(
            r#"<body>
                <div id="inside"></div>
                <div id="half"></div>
                <div id="outside"></div>
                <div id="transparent" style="opacity: 0"></div>
                <div id="invisible" style="visibility: hidden"></div>
                <div id="collapsed" style="display: none"></div>
                <div id="flat"></div>
                <div id="nolayout"></div>
            </body>"#,
        )
        .with_viewport(800.0, 600.0);
        doc.set_layout("#inside", BoundingBox::new(10.0, 10.0, 100.0, 100.0))
            .unwrap()
            .set_layout("#half", BoundingBox::new(750.0, 0.0, 100.0, 100.0))
            .unwrap()
            .set_layout("#outside", BoundingBox::new(0.0, 700.0, 50.0, 50.0))
            .unwrap()
            .set_layout("#transparent, #invisible, #collapsed", BoundingBox::new(0.0, 0.0, 10.0, 10.0))
            .unwrap()
            .set_layout("#flat", BoundingBox::new(0.0, 0.0, 100.0, 0.0))
            .unwrap();
        doc
    }

    fn el<'a>(doc: &'a Document, id: &str) -> Element<'a> {
        doc.query_selector(&format!("#{id}")).unwrap().unwrap()
    }

    #[test]
    fn test_visible_element() {
        let doc = page();
        assert!(is_element_visible(&el(&doc, "inside")));
    }

    #[test]
    fn test_hidden_by_style() {
        let doc = page();
        assert!(!is_element_visible(&el(&doc, "transparent")));
        assert!(!is_element_visible(&el(&doc, "invisible")));
        assert!(!is_element_visible(&el(&doc, "collapsed")));
    }

    #[test]
    fn test_hidden_by_empty_box() {
        let doc = page();
        assert!(!is_element_visible(&el(&doc, "flat")));
        assert!(!is_element_visible(&el(&doc, "nolayout")));
    }

    #[test]
    fn test_viewport_containment() {
        let doc = page();
        assert!(is_in_viewport(&el(&doc, "inside")));
        assert!(!is_in_viewport(&el(&doc, "half")));
        assert!(is_partially_in_viewport(&el(&doc, "half")));
        assert!(!is_partially_in_viewport(&el(&doc, "outside")));
    }

    #[test]
    fn test_visibility_ratio() {
        let doc = page();
        assert_eq!(get_visibility_ratio(&el(&doc, "inside")), 1.0);
        assert!((get_visibility_ratio(&el(&doc, "half")) - 0.5).abs() < 1e-9);
        assert_eq!(get_visibility_ratio(&el(&doc, "outside")), 0.0);
    }

    #[test]
    fn test_visibility_ratio_zero_for_invisible_or_flat() {
        let doc = page();
        assert_eq!(get_visibility_ratio(&el(&doc, "transparent")), 0.0);
        assert_eq!(get_visibility_ratio(&el(&doc, "flat")), 0.0);
    }
}
