//! Expectations for test bodies.
//!
//! Matchers return `Result<(), ExpectationError>` so a body can use `?` and
//! the runner turns the error into a `fail` outcome with the message kept
//! verbatim. Nothing here swallows a failure.
//!
//! ```ignore
//! expect(5).to_be(5)?;
//! expect(ctx.element.local_name()).not().to_be("div")?;
//! expect_element(ctx.element).to_have_attribute("alt")?;
//! ```

use crate::dom::Element;
use crate::visibility::is_element_visible;
use std::fmt::Display;
use thiserror::Error;

/// A failed expectation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExpectationError {
    /// Human-readable message
    pub message: String,
}

impl ExpectationError {
    /// Create a new expectation error
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result of a matcher
pub type ExpectationResult = Result<(), ExpectationError>;

/// Start an expectation on a value
#[must_use]
pub const fn expect<T>(actual: T) -> Expectation<T> {
    Expectation { actual }
}

/// Value under test
#[derive(Debug, Clone)]
pub struct Expectation<T> {
    actual: T,
}

impl<T: PartialEq + Display> Expectation<T> {
    /// Strict equality
    pub fn to_be(&self, expected: T) -> ExpectationResult {
        if self.actual == expected {
            Ok(())
        } else {
            Err(ExpectationError::new(format!(
                "Expected {} to be {}",
                self.actual, expected
            )))
        }
    }

    /// Negated matchers
    #[must_use]
    pub const fn not(&self) -> NegatedExpectation<'_, T> {
        NegatedExpectation { inner: self }
    }
}

impl Expectation<bool> {
    /// Shorthand for `to_be(true)`
    pub fn to_be_true(&self) -> ExpectationResult {
        self.to_be(true)
    }

    /// Shorthand for `to_be(false)`
    pub fn to_be_false(&self) -> ExpectationResult {
        self.to_be(false)
    }
}

/// Negated form of an [`Expectation`]
#[derive(Debug)]
pub struct NegatedExpectation<'e, T> {
    inner: &'e Expectation<T>,
}

impl<T: PartialEq + Display> NegatedExpectation<'_, T> {
    /// Strict inequality
    pub fn to_be(&self, expected: T) -> ExpectationResult {
        if self.inner.actual == expected {
            Err(ExpectationError::new(format!(
                "Expected {} not to be {}",
                self.inner.actual, expected
            )))
        } else {
            Ok(())
        }
    }
}

/// Start an expectation on an element
#[must_use]
pub const fn expect_element(element: Element<'_>) -> ElementExpectation<'_> {
    ElementExpectation {
        element,
        negated: false,
    }
}

/// DOM matchers
#[derive(Debug, Clone, Copy)]
pub struct ElementExpectation<'a> {
    element: Element<'a>,
    negated: bool,
}

impl ElementExpectation<'_> {
    /// Flip the next matcher
    #[must_use]
    pub const fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    fn check(&self, condition: bool, describe: impl FnOnce() -> String) -> ExpectationResult {
        if condition != self.negated {
            return Ok(());
        }
        let not = if self.negated { " not" } else { "" };
        Err(ExpectationError::new(format!(
            "Expected element <{}>{not} {}",
            self.element.local_name(),
            describe()
        )))
    }

    /// Text content, whitespace-collapsed, contains `text`
    pub fn to_have_text(&self, text: &str) -> ExpectationResult {
        let actual = normalize_whitespace(&self.element.text_content());
        let wanted = normalize_whitespace(text);
        self.check(actual.contains(&wanted), || {
            format!("to have text {wanted:?}, found {actual:?}")
        })
    }

    /// Attribute is present
    pub fn to_have_attribute(&self, name: &str) -> ExpectationResult {
        self.check(self.element.has_attribute(name), || {
            format!("to have attribute {name:?}")
        })
    }

    /// Attribute is present with exactly `value`
    pub fn to_have_attribute_value(&self, name: &str, value: &str) -> ExpectationResult {
        let actual = self.element.attr(name);
        self.check(actual == Some(value), || match actual {
            Some(found) => format!("to have attribute {name:?} = {value:?}, found {found:?}"),
            None => format!("to have attribute {name:?} = {value:?}, attribute missing"),
        })
    }

    /// Rendered and perceivable
    pub fn to_be_visible(&self) -> ExpectationResult {
        self.check(is_element_visible(&self.element), || {
            "to be visible".to_string()
        })
    }

    /// Class list contains `class`
    pub fn to_have_class(&self, class: &str) -> ExpectationResult {
        self.check(self.element.has_class(class), || {
            let classes: Vec<&str> = self.element.classes().collect();
            format!("to have class {class:?}, found {classes:?}")
        })
    }
}

/// Collapse runs of whitespace to single spaces and trim
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{BoundingBox, Document};

    mod value_tests {
        use super::*;

        #[test]
        fn test_to_be_passes_on_equal() {
            assert!(expect(5).to_be(5).is_ok());
        }

        #[test]
        fn test_to_be_message() {
            let err = expect(5).to_be(10).unwrap_err();
            assert_eq!(err.to_string(), "Expected 5 to be 10");
        }

        #[test]
        fn test_not_to_be() {
            assert!(expect(5).not().to_be(10).is_ok());
            let err = expect(5).not().to_be(5).unwrap_err();
            assert_eq!(err.message, "Expected 5 not to be 5");
        }

        #[test]
        fn test_bool_shorthands() {
            assert!(expect(true).to_be_true().is_ok());
            assert_eq!(
                expect(true).to_be_false().unwrap_err().message,
                "Expected true to be false"
            );
        }

        #[test]
        fn test_strings_are_interpolated_plain() {
            let err = expect("a").to_be("b").unwrap_err();
            assert_eq!(err.message, "Expected a to be b");
            let err = expect("x").not().to_be("x").unwrap_err();
            assert_eq!(err.message, "Expected x not to be x");
        }
    }

    mod element_tests {
        use super::*;

        fn doc() -> Document {
            let mut doc = Document::parse(
                r#"<body><button class="btn primary" type="submit">  Save
                   changes </button><img src="x.png"></body>"#,
            );
            doc.set_layout("button", BoundingBox::new(0.0, 0.0, 80.0, 24.0))
                .unwrap();
            doc
        }

        #[test]
        fn test_to_have_text_normalizes_whitespace() {
            let doc = doc();
            let button = doc.query_selector("button").unwrap().unwrap();
            assert!(expect_element(button).to_have_text("Save changes").is_ok());
            assert!(expect_element(button).to_have_text("Delete").is_err());
        }

        #[test]
        fn test_to_have_attribute() {
            let doc = doc();
            let img = doc.query_selector("img").unwrap().unwrap();
            assert!(expect_element(img).to_have_attribute("src").is_ok());
            let err = expect_element(img).to_have_attribute("alt").unwrap_err();
            assert_eq!(err.message, r#"Expected element <img> to have attribute "alt""#);
            assert!(expect_element(img).not().to_have_attribute("alt").is_ok());
        }

        #[test]
        fn test_to_have_attribute_value() {
            let doc = doc();
            let button = doc.query_selector("button").unwrap().unwrap();
            assert!(expect_element(button)
                .to_have_attribute_value("type", "submit")
                .is_ok());
            let err = expect_element(button)
                .to_have_attribute_value("type", "button")
                .unwrap_err();
            assert!(err.message.contains("found \"submit\""));
        }

        #[test]
        fn test_to_have_class() {
            let doc = doc();
            let button = doc.query_selector("button").unwrap().unwrap();
            assert!(expect_element(button).to_have_class("primary").is_ok());
            assert!(expect_element(button).to_have_class("danger").is_err());
        }

        #[test]
        fn test_to_be_visible() {
            let doc = doc();
            let button = doc.query_selector("button").unwrap().unwrap();
            let img = doc.query_selector("img").unwrap().unwrap();
            assert!(expect_element(button).to_be_visible().is_ok());
            let err = expect_element(img).to_be_visible().unwrap_err();
            assert_eq!(err.message, "Expected element <img> to be visible");
            assert!(expect_element(img).not().to_be_visible().is_ok());
        }
    }
}
