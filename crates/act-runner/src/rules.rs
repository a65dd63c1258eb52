//! Built-in ACT rules.
//!
//! Each rule registers as one suite named by its ACT rule id, scoped to the
//! elements the rule applies to. Elements the rule does not apply to (for
//! example, content hidden from assistive technology) are skipped, so a
//! rule whose suite records no pass and no fail is inapplicable.
//!
//! Contrast uses the WCAG 2.1 relative-luminance formula:
//! - 4.5:1 for normal text (SC 1.4.3)
//! - 3:1 for large text

use crate::context::{TestContext, TestError, TestFnResult};
use crate::dom::Element;
use crate::expect::normalize_whitespace;
use crate::registry::Registry;
use crate::result::{RunnerError, RunnerResult};

/// Minimum contrast ratio for normal text (WCAG 2.1 AA)
pub const MIN_CONTRAST_NORMAL: f32 = 4.5;

/// Minimum contrast ratio for large text (WCAG 2.1 AA)
pub const MIN_CONTRAST_LARGE: f32 = 3.0;

/// A registered ACT rule
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// ACT rule id, used as the suite name
    pub id: &'static str,
    /// Test name
    pub name: &'static str,
    /// Elements the rule inspects
    pub selector: &'static str,
    /// WCAG success criteria the rule maps to
    pub wcag: &'static [&'static str],
    check: fn(&TestContext<'_>) -> TestFnResult,
}

/// Every built-in rule, in registration order
pub const RULES: &[Rule] = &[
    Rule {
        id: "23a2a8",
        name: "image has non-empty accessible name",
        selector: "img",
        wcag: &["1.1.1"],
        check: image_has_name,
    },
    Rule {
        id: "97a4e1",
        name: "button has non-empty accessible name",
        selector: "button, input[type=\"button\"], input[type=\"submit\"], input[type=\"reset\"], [role=\"button\"]",
        wcag: &["4.1.2"],
        check: button_has_name,
    },
    Rule {
        id: "b5c3f8",
        name: "html element has lang attribute",
        selector: "html",
        wcag: &["3.1.1"],
        check: html_has_lang,
    },
    Rule {
        id: "2779a5",
        name: "html page has non-empty title",
        selector: "html",
        wcag: &["2.4.2"],
        check: page_has_title,
    },
    Rule {
        id: "c487ae",
        name: "link has non-empty accessible name",
        selector: "a[href], [role=\"link\"]",
        wcag: &["2.4.4", "4.1.2"],
        check: link_has_name,
    },
    Rule {
        id: "e086e5",
        name: "form field has non-empty accessible name",
        selector: "input:not([type=\"hidden\"]):not([type=\"button\"]):not([type=\"submit\"]):not([type=\"reset\"]):not([type=\"image\"]), select, textarea",
        wcag: &["4.1.2"],
        check: form_field_has_name,
    },
    Rule {
        id: "b4f0c3",
        name: "meta viewport allows for zoom",
        selector: "meta[name=\"viewport\"]",
        wcag: &["1.4.4", "1.4.10"],
        check: viewport_allows_zoom,
    },
    Rule {
        id: "afw4f7",
        name: "text has minimum contrast",
        selector: "body *",
        wcag: &["1.4.3"],
        check: text_has_minimum_contrast,
    },
];

/// Look up a rule by id
#[must_use]
pub fn rule(id: &str) -> Option<&'static Rule> {
    RULES.iter().find(|r| r.id == id)
}

fn register_rule(registry: &mut Registry, rule: &'static Rule) {
    registry.describe_scoped(rule.id, rule.selector, |suite| {
        suite.test(rule.name, rule.check);
    });
}

/// Register every built-in rule
pub fn register_all(registry: &mut Registry) {
    for rule in RULES {
        register_rule(registry, rule);
    }
}

/// Register the named rules, in the order given
pub fn register(registry: &mut Registry, ids: &[&str]) -> RunnerResult<()> {
    let rules = ids
        .iter()
        .map(|id| {
            rule(id).ok_or_else(|| RunnerError::Config {
                message: format!("unknown ACT rule '{id}'"),
            })
        })
        .collect::<RunnerResult<Vec<_>>>()?;
    for rule in rules {
        register_rule(registry, rule);
    }
    Ok(())
}

/// Color represented as RGB values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    /// Red component (0-255)
    pub r: u8,
    /// Green component (0-255)
    pub g: u8,
    /// Blue component (0-255)
    pub b: u8,
}

impl Color {
    /// Black
    pub const BLACK: Self = Self::new(0, 0, 0);
    /// White
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Create a new color
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Create from hex value (e.g., 0xFF5500)
    #[must_use]
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as u8,
            g: ((hex >> 8) & 0xFF) as u8,
            b: (hex & 0xFF) as u8,
        }
    }

    /// Parse a CSS color value.
    ///
    /// Accepts `#rgb`, `#rrggbb`, `rgb()`, `rgba()` and a handful of
    /// keywords. Fully transparent values parse to `None`; partial alpha
    /// is treated as opaque.
    #[must_use]
    pub fn parse_css(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        if let Some(hex) = value.strip_prefix('#') {
            return match hex.len() {
                3 => {
                    let expanded: String = hex.chars().flat_map(|c| [c, c]).collect();
                    u32::from_str_radix(&expanded, 16).ok().map(Self::from_hex)
                }
                6 => u32::from_str_radix(hex, 16).ok().map(Self::from_hex),
                _ => None,
            };
        }
        if let Some(args) = value
            .strip_prefix("rgba(")
            .or_else(|| value.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let parts: Vec<&str> = args
                .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
                .filter(|p| !p.is_empty())
                .collect();
            if parts.len() < 3 {
                return None;
            }
            if let Some(alpha) = parts.get(3).and_then(|a| a.parse::<f32>().ok()) {
                if alpha <= 0.0 {
                    return None;
                }
            }
            let channel = |p: &str| p.parse::<f32>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8);
            return Some(Self::new(
                channel(parts[0])?,
                channel(parts[1])?,
                channel(parts[2])?,
            ));
        }
        match value.as_str() {
            "black" => Some(Self::BLACK),
            "white" => Some(Self::WHITE),
            "red" => Some(Self::new(255, 0, 0)),
            "green" => Some(Self::new(0, 128, 0)),
            "blue" => Some(Self::new(0, 0, 255)),
            "yellow" => Some(Self::new(255, 255, 0)),
            "gray" | "grey" => Some(Self::new(128, 128, 128)),
            "silver" => Some(Self::new(192, 192, 192)),
            _ => None,
        }
    }

    /// Get the relative luminance (per WCAG 2.1)
    #[must_use]
    pub fn relative_luminance(&self) -> f32 {
        let r = srgb_to_linear(f32::from(self.r) / 255.0);
        let g = srgb_to_linear(f32::from(self.g) / 255.0);
        let b = srgb_to_linear(f32::from(self.b) / 255.0);

        0.2126 * r + 0.7152 * g + 0.0722 * b
    }

    /// Calculate contrast ratio with another color
    #[must_use]
    pub fn contrast_ratio(&self, other: &Self) -> f32 {
        let l1 = self.relative_luminance();
        let l2 = other.relative_luminance();

        let lighter = l1.max(l2);
        let darker = l1.min(l2);

        (lighter + 0.05) / (darker + 0.05)
    }
}

/// Convert sRGB to linear RGB (per WCAG 2.1)
fn srgb_to_linear(value: f32) -> f32 {
    if value <= 0.03928 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

/// Whether the element is excluded from the accessibility tree
#[must_use]
pub fn is_hidden_from_assistive_tech(element: &Element<'_>) -> bool {
    if element.in_display_none_subtree() {
        return true;
    }
    let style = element.computed_style();
    if style.visibility == "hidden" || style.visibility == "collapse" {
        return true;
    }
    std::iter::once(*element)
        .chain(element.ancestors())
        .any(|el| el.attr("aria-hidden").is_some_and(|v| v.trim() == "true"))
}

fn has_presentational_role(element: &Element<'_>) -> bool {
    element
        .attr("role")
        .is_some_and(|role| matches!(role.trim(), "presentation" | "none"))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(normalize_whitespace)
        .filter(|v| !v.is_empty())
}

fn labelled_by(element: &Element<'_>) -> Option<String> {
    let ids = element.attr("aria-labelledby")?;
    let document = element.document();
    let text: Vec<String> = ids
        .split_whitespace()
        .filter_map(|id| {
            document
                .query_selector_all("[id]")
                .unwrap_or_default()
                .into_iter()
                .find(|el| el.id() == Some(id))
        })
        .map(|el| normalize_whitespace(&el.text_content()))
        .collect();
    non_empty(Some(text.join(" ").as_str()))
}

/// Text of the subtree, counting `alt` of descendant images
fn subtree_text(element: &Element<'_>) -> String {
    let mut parts = vec![element.text_content()];
    for img in element
        .element_ref()
        .descendants()
        .filter_map(scraper::ElementRef::wrap)
        .filter(|node| node.value().name() == "img")
    {
        if let Some(alt) = img.value().attr("alt") {
            parts.push(alt.to_string());
        }
    }
    normalize_whitespace(&parts.join(" "))
}

fn associated_label(element: &Element<'_>) -> Option<String> {
    if let Some(id) = element.id() {
        let labels = element
            .document()
            .query_selector_all("label[for]")
            .unwrap_or_default();
        let text: Vec<String> = labels
            .iter()
            .filter(|label| label.attr("for") == Some(id))
            .map(|label| label.text_content())
            .collect();
        if let Some(name) = non_empty(Some(text.join(" ").as_str())) {
            return Some(name);
        }
    }
    element
        .ancestors()
        .find(|el| el.local_name() == "label")
        .and_then(|label| non_empty(Some(label.text_content().as_str())))
}

/// Simplified accessible name computation.
///
/// Order: `aria-labelledby`, `aria-label`, native sources for the element
/// kind, then `title`.
#[must_use]
pub fn accessible_name(element: &Element<'_>) -> Option<String> {
    if let Some(name) = labelled_by(element) {
        return Some(name);
    }
    if let Some(name) = non_empty(element.attr("aria-label")) {
        return Some(name);
    }
    let native = match element.local_name() {
        "img" => non_empty(element.attr("alt")),
        "input" => match element.attr("type").map(str::to_ascii_lowercase).as_deref() {
            Some("submit") => non_empty(element.attr("value")).or_else(|| Some("Submit".into())),
            Some("reset") => non_empty(element.attr("value")).or_else(|| Some("Reset".into())),
            Some("button") => non_empty(element.attr("value")),
            _ => associated_label(element),
        },
        "select" | "textarea" => associated_label(element),
        _ => non_empty(Some(subtree_text(element).as_str())),
    };
    native.or_else(|| non_empty(element.attr("title")))
}

fn missing_name(element: &Element<'_>) -> TestError {
    TestError::failed(format!(
        "<{}> has no accessible name",
        element.local_name()
    ))
}

fn image_has_name(ctx: &TestContext<'_>) -> TestFnResult {
    let element = &ctx.element;
    if is_hidden_from_assistive_tech(element) || has_presentational_role(element) {
        return Err(ctx.skip());
    }
    // alt="" marks the image decorative
    if element.attr("alt").is_some_and(|alt| alt.is_empty()) && accessible_name(element).is_none() {
        return Err(ctx.skip());
    }
    accessible_name(element).map(drop).ok_or_else(|| missing_name(element))
}

fn button_has_name(ctx: &TestContext<'_>) -> TestFnResult {
    let element = &ctx.element;
    if is_hidden_from_assistive_tech(element) {
        return Err(ctx.skip());
    }
    accessible_name(element).map(drop).ok_or_else(|| missing_name(element))
}

fn link_has_name(ctx: &TestContext<'_>) -> TestFnResult {
    button_has_name(ctx)
}

fn form_field_has_name(ctx: &TestContext<'_>) -> TestFnResult {
    let element = &ctx.element;
    if is_hidden_from_assistive_tech(element) || element.has_attribute("disabled") {
        return Err(ctx.skip());
    }
    accessible_name(element).map(drop).ok_or_else(|| missing_name(element))
}

fn html_has_lang(ctx: &TestContext<'_>) -> TestFnResult {
    match ctx.element.attr("lang").map(str::trim) {
        Some(lang) if !lang.is_empty() => Ok(()),
        _ => Err(TestError::failed("<html> has no lang attribute")),
    }
}

fn page_has_title(ctx: &TestContext<'_>) -> TestFnResult {
    match ctx.document.title() {
        Some(title) if !title.is_empty() => Ok(()),
        Some(_) => Err(TestError::failed("<title> is empty")),
        None => Err(TestError::failed("document has no <title>")),
    }
}

fn viewport_allows_zoom(ctx: &TestContext<'_>) -> TestFnResult {
    let Some(content) = ctx.element.attr("content") else {
        return Err(ctx.skip());
    };
    for directive in content.split([',', ';']) {
        let Some((key, value)) = directive.split_once('=') else {
            continue;
        };
        let value = value.trim().to_ascii_lowercase();
        match key.trim().to_ascii_lowercase().as_str() {
            "user-scalable" if matches!(value.as_str(), "no" | "0") => {
                return Err(TestError::failed(format!(
                    "meta viewport disables zoom (user-scalable={value})"
                )));
            }
            "maximum-scale" => {
                if let Ok(scale) = value.parse::<f32>() {
                    if scale < 2.0 {
                        return Err(TestError::failed(format!(
                            "meta viewport limits zoom (maximum-scale={value})"
                        )));
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn own_text(element: &Element<'_>) -> String {
    element
        .element_ref()
        .children()
        .filter_map(|node| node.value().as_text().map(|text| &**text))
        .collect()
}

fn background_of(element: &Element<'_>) -> Color {
    std::iter::once(*element)
        .chain(element.ancestors())
        .find_map(|el| {
            el.computed_style()
                .background_color
                .as_deref()
                .and_then(Color::parse_css)
        })
        .unwrap_or(Color::WHITE)
}

fn text_has_minimum_contrast(ctx: &TestContext<'_>) -> TestFnResult {
    let element = &ctx.element;
    if matches!(element.local_name(), "script" | "style" | "noscript" | "template")
        || own_text(element).trim().is_empty()
        || is_hidden_from_assistive_tech(element)
    {
        return Err(ctx.skip());
    }
    let style = element.computed_style();
    let foreground = style
        .color
        .as_deref()
        .and_then(Color::parse_css)
        .unwrap_or(Color::BLACK);
    let background = background_of(element);
    let ratio = foreground.contrast_ratio(&background);
    let large = matches!(element.local_name(), "h1" | "h2");
    let minimum = if large { MIN_CONTRAST_LARGE } else { MIN_CONTRAST_NORMAL };
    if ratio >= minimum {
        Ok(())
    } else {
        Err(TestError::failed(format!(
            "contrast ratio {ratio:.2}:1 is below {minimum}:1"
        )))
    }
}
