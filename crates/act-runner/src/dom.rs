//! Page model the runner queries.
//!
//! A [`Document`] is the host's view of a live page: the parsed HTML tree,
//! the viewport, and whatever layout and style information the host can
//! provide. There is no layout engine here, so element boxes come from
//! layout rules the host registers (`selector -> BoundingBox`, last match
//! wins) and computed style comes from registered style rules followed by
//! the inline `style` attribute.
//!
//! ```text
//!   host (crawler, engine bridge, test)
//!        │  parse + set_layout + add_style_rule
//!        ▼
//!   ┌──────────┐  query_selector_all   ┌──────────┐
//!   │ Document │ ────────────────────► │ Element  │ ──► rect, style, text
//!   └──────────┘                       └──────────┘
//! ```

use crate::result::{RunnerError, RunnerResult};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default viewport width in CSS pixels
pub const DEFAULT_VIEWPORT_WIDTH: f64 = 1280.0;

/// Default viewport height in CSS pixels
pub const DEFAULT_VIEWPORT_HEIGHT: f64 = 720.0;

/// Bounding box for an element, in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X position
    pub x: f64,
    /// Y position
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Zero-sized box at the origin
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Top edge
    #[must_use]
    pub fn top(&self) -> f64 {
        self.y
    }

    /// Left edge
    #[must_use]
    pub fn left(&self) -> f64 {
        self.x
    }

    /// Right edge
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Area of the box
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Whether the box has no area
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Intersection with another box, if they overlap
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right > left && bottom > top {
            Some(Self::new(left, top, right - left, bottom - top))
        } else {
            None
        }
    }
}

/// Visible area of the page
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in CSS pixels
    pub width: f64,
    /// Height in CSS pixels
    pub height: f64,
}

impl Viewport {
    /// Create a viewport
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Viewport as a box anchored at the origin
    #[must_use]
    pub const fn as_rect(&self) -> BoundingBox {
        BoundingBox::new(0.0, 0.0, self.width, self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(DEFAULT_VIEWPORT_WIDTH, DEFAULT_VIEWPORT_HEIGHT)
    }
}

/// The subset of computed style the runner reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedStyle {
    /// `display`
    pub display: String,
    /// `visibility` (inherited)
    pub visibility: String,
    /// `opacity`
    pub opacity: f64,
    /// `color` (inherited)
    pub color: Option<String>,
    /// `background-color`
    pub background_color: Option<String>,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "inline".to_string(),
            visibility: "visible".to_string(),
            opacity: 1.0,
            color: None,
            background_color: None,
        }
    }
}

#[derive(Debug)]
struct LayoutRule {
    selector: Selector,
    rect: BoundingBox,
}

#[derive(Debug)]
struct StyleRule {
    selector: Selector,
    declarations: Vec<(String, String)>,
}

/// Parse a CSS selector, mapping parser errors into [`RunnerError`]
pub fn compile_selector(selector: &str) -> RunnerResult<Selector> {
    Selector::parse(selector).map_err(|e| RunnerError::invalid_selector(selector, e.to_string()))
}

/// Split a declaration block (`a: b; c: d`) into lower-cased property/value pairs
pub(crate) fn parse_declarations(block: &str) -> Vec<(String, String)> {
    block
        .split(';')
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let value = value.trim().trim_end_matches("!important").trim();
            if property.is_empty() || value.is_empty() {
                None
            } else {
                Some((property, value.to_ascii_lowercase()))
            }
        })
        .collect()
}

fn parse_opacity(value: &str) -> Option<f64> {
    if let Some(percent) = value.strip_suffix('%') {
        percent.trim().parse::<f64>().ok().map(|p| p / 100.0)
    } else {
        value.parse::<f64>().ok()
    }
}

/// A parsed page plus host-provided layout and style
pub struct Document {
    html: Html,
    viewport: Viewport,
    url: Option<String>,
    layout: Vec<LayoutRule>,
    styles: Vec<StyleRule>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("viewport", &self.viewport)
            .field("url", &self.url)
            .field("layout_rules", &self.layout.len())
            .field("style_rules", &self.styles.len())
            .finish_non_exhaustive()
    }
}

impl Document {
    /// Parse an HTML document with the default viewport
    #[must_use]
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
            viewport: Viewport::default(),
            url: None,
            layout: Vec::new(),
            styles: Vec::new(),
        }
    }

    /// Set the viewport size
    #[must_use]
    pub fn with_viewport(mut self, width: f64, height: f64) -> Self {
        self.viewport = Viewport::new(width, height);
        self
    }

    /// Set the page URL
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Viewport of the page
    #[must_use]
    pub const fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// URL of the page, if known
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Underlying parsed tree
    #[must_use]
    pub const fn html(&self) -> &Html {
        &self.html
    }

    /// Register the box for every element matching `selector`.
    ///
    /// Later registrations take precedence over earlier ones.
    pub fn set_layout(&mut self, selector: &str, rect: BoundingBox) -> RunnerResult<&mut Self> {
        let selector = compile_selector(selector)?;
        self.layout.push(LayoutRule { selector, rect });
        Ok(self)
    }

    /// Register a style rule (`"display: none; opacity: 0.5"`)
    pub fn add_style_rule(&mut self, selector: &str, declarations: &str) -> RunnerResult<&mut Self> {
        let selector = compile_selector(selector)?;
        self.styles.push(StyleRule {
            selector,
            declarations: parse_declarations(declarations),
        });
        Ok(self)
    }

    /// Elements matching a precompiled selector, in document order
    #[must_use]
    pub fn select(&self, selector: &Selector) -> Vec<Element<'_>> {
        self.html
            .select(selector)
            .map(|node| Element::new(node, self))
            .collect()
    }

    /// Equivalent of `document.querySelectorAll`
    pub fn query_selector_all(&self, selector: &str) -> RunnerResult<Vec<Element<'_>>> {
        let compiled = compile_selector(selector)?;
        Ok(self.select(&compiled))
    }

    /// Equivalent of `document.querySelector`
    pub fn query_selector(&self, selector: &str) -> RunnerResult<Option<Element<'_>>> {
        let compiled = compile_selector(selector)?;
        Ok(self
            .html
            .select(&compiled)
            .next()
            .map(|node| Element::new(node, self)))
    }

    /// The `<html>` element
    #[must_use]
    pub fn root(&self) -> Element<'_> {
        Element::new(self.html.root_element(), self)
    }

    /// The `<body>` element, if present
    #[must_use]
    pub fn body(&self) -> Option<Element<'_>> {
        self.root().children().find(|child| child.local_name() == "body")
    }

    /// Text of the first `<title>` element
    #[must_use]
    pub fn title(&self) -> Option<String> {
        self.query_selector("title")
            .ok()
            .flatten()
            .map(|title| title.text_content().trim().to_string())
    }
}

/// Handle to an element inside a [`Document`]
#[derive(Clone, Copy)]
pub struct Element<'a> {
    node: ElementRef<'a>,
    document: &'a Document,
}

impl fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Element(<{}>)", self.local_name())
    }
}

impl<'a> Element<'a> {
    pub(crate) const fn new(node: ElementRef<'a>, document: &'a Document) -> Self {
        Self { node, document }
    }

    /// Underlying scraper element
    #[must_use]
    pub const fn element_ref(&self) -> ElementRef<'a> {
        self.node
    }

    /// Owning document
    #[must_use]
    pub const fn document(&self) -> &'a Document {
        self.document
    }

    /// Lower-case local name (`img`)
    #[must_use]
    pub fn local_name(&self) -> &'a str {
        self.node.value().name()
    }

    /// Upper-case tag name (`IMG`), as DOM `tagName` reports it for HTML
    #[must_use]
    pub fn tag_name(&self) -> String {
        self.local_name().to_ascii_uppercase()
    }

    /// `id` attribute
    #[must_use]
    pub fn id(&self) -> Option<&'a str> {
        self.node.value().id()
    }

    /// Attribute value
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.node.value().attr(name)
    }

    /// Whether the attribute is present (with any value)
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Class list
    pub fn classes(&self) -> impl Iterator<Item = &'a str> {
        let mut unique: Vec<&'a str> = Vec::new();
        for class in self.attr("class").unwrap_or_default().split_whitespace() {
            if !unique.contains(&class) {
                unique.push(class);
            }
        }
        unique.into_iter()
    }

    /// Whether the class list contains `class`
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Concatenated text of all descendant text nodes
    #[must_use]
    pub fn text_content(&self) -> String {
        self.node.text().collect()
    }

    /// Serialized markup of the element and its subtree
    #[must_use]
    pub fn outer_html(&self) -> String {
        self.node.html()
    }

    /// Parent element, `None` for the root
    #[must_use]
    pub fn parent_element(&self) -> Option<Self> {
        self.node
            .parent()
            .and_then(ElementRef::wrap)
            .map(|node| Self::new(node, self.document))
    }

    /// Ancestor elements, nearest first
    pub fn ancestors(&self) -> impl Iterator<Item = Element<'a>> + 'a {
        let document = self.document;
        self.node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .map(move |node| Element::new(node, document))
    }

    /// Element children
    pub fn children(&self) -> impl Iterator<Item = Element<'a>> + 'a {
        let document = self.document;
        self.node
            .children()
            .filter_map(ElementRef::wrap)
            .map(move |node| Element::new(node, document))
    }

    /// 1-based position among element siblings (the `:nth-child` index)
    #[must_use]
    pub fn index_among_siblings(&self) -> usize {
        self.node
            .prev_siblings()
            .filter(|sibling| sibling.value().is_element())
            .count()
            + 1
    }

    /// Whether another element sibling has the same tag name
    #[must_use]
    pub fn has_same_tag_sibling(&self) -> bool {
        let name = self.local_name();
        self.node
            .prev_siblings()
            .chain(self.node.next_siblings())
            .filter_map(ElementRef::wrap)
            .any(|sibling| sibling.value().name() == name)
    }

    /// Node identity
    #[must_use]
    pub fn same_node(&self, other: &Element<'_>) -> bool {
        std::ptr::eq(self.document, other.document) && self.node.id() == other.node.id()
    }

    /// Whether the element matches a compiled selector
    #[must_use]
    pub fn matches(&self, selector: &Selector) -> bool {
        selector.matches(&self.node)
    }

    fn declarations(&self) -> Vec<(String, String)> {
        let mut declarations = Vec::new();
        if self.has_attribute("hidden") {
            declarations.push(("display".to_string(), "none".to_string()));
        }
        for rule in &self.document.styles {
            if self.matches(&rule.selector) {
                declarations.extend(rule.declarations.iter().cloned());
            }
        }
        if let Some(inline) = self.attr("style") {
            declarations.extend(parse_declarations(inline));
        }
        declarations
    }

    fn declared(&self, property: &str) -> Option<String> {
        self.declarations()
            .into_iter()
            .rev()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v)
    }

    /// Cascaded style: style rules in registration order, then inline style.
    ///
    /// Inherited properties are carried down from the root in one pass.
    #[must_use]
    pub fn computed_style(&self) -> ComputedStyle {
        let mut lineage: Vec<Element<'a>> = std::iter::once(*self).chain(self.ancestors()).collect();
        lineage.reverse();
        let mut style = ComputedStyle::default();
        let mut parent: Option<ComputedStyle> = None;
        for element in lineage {
            style = element.resolve_style(parent.as_ref());
            parent = Some(style.clone());
        }
        style
    }

    fn resolve_style(&self, parent: Option<&ComputedStyle>) -> ComputedStyle {
        let declarations = self.declarations();
        let lookup = |property: &str| {
            declarations
                .iter()
                .rev()
                .find(|(p, _)| p == property)
                .map(|(_, v)| v.clone())
        };

        let visibility = lookup("visibility")
            .filter(|v| v != "inherit")
            .or_else(|| parent.map(|p| p.visibility.clone()))
            .unwrap_or_else(|| "visible".to_string());
        let color = lookup("color")
            .filter(|v| v != "inherit")
            .or_else(|| parent.and_then(|p| p.color.clone()));

        ComputedStyle {
            display: lookup("display").unwrap_or_else(|| "inline".to_string()),
            visibility,
            opacity: lookup("opacity")
                .and_then(|v| parse_opacity(&v))
                .unwrap_or(1.0),
            color,
            background_color: lookup("background-color").or_else(|| lookup("background")),
        }
    }

    /// Whether this element or an ancestor computes to `display: none`
    #[must_use]
    pub fn in_display_none_subtree(&self) -> bool {
        std::iter::once(*self)
            .chain(self.ancestors())
            .any(|el| el.declared("display").as_deref() == Some("none"))
    }

    /// Equivalent of `getBoundingClientRect`; zero when no layout is known
    #[must_use]
    pub fn bounding_client_rect(&self) -> BoundingBox {
        if self.in_display_none_subtree() {
            return BoundingBox::zero();
        }
        self.document
            .layout
            .iter()
            .rev()
            .find(|rule| self.matches(&rule.selector))
            .map_or_else(BoundingBox::zero, |rule| rule.rect)
    }
}
