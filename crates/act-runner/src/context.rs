//! Per-invocation test context.

use crate::dom::{Document, Element};
use crate::expect::ExpectationError;
use crate::selector::generate_selector;
use std::cell::RefCell;
use thiserror::Error;

/// Ways a test body (or hook) can end other than passing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TestError {
    /// An expectation failed
    #[error(transparent)]
    Expectation(#[from] ExpectationError),
    /// The body asked to be skipped
    #[error("Test skipped")]
    Skipped,
    /// The body marked itself todo
    #[error("Test marked as todo")]
    Todo(Option<String>),
    /// Custom failure
    #[error("{0}")]
    Failed(String),
}

impl TestError {
    /// Custom failure with a message
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Return type of test bodies and hooks
pub type TestFnResult = Result<(), TestError>;

/// Interrupt recorded through [`TestContext::skip`] or [`TestContext::todo`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interrupt {
    /// Skip the test
    Skip,
    /// Mark the test todo
    Todo(Option<String>),
}

/// Context handed to a test body for one matched element.
///
/// Transient: it lives for a single (element, test) invocation. Calling
/// [`skip`](Self::skip) or [`todo`](Self::todo) changes the in-flight
/// result, never the test definition.
#[derive(Debug)]
pub struct TestContext<'a> {
    /// Element under test
    pub element: Element<'a>,
    /// Effective selector that matched the element
    pub selector: &'a str,
    /// Page being tested
    pub document: &'a Document,
    interrupt: RefCell<Option<Interrupt>>,
}

impl<'a> TestContext<'a> {
    /// Create a context for `element`
    #[must_use]
    pub fn new(element: Element<'a>, selector: &'a str, document: &'a Document) -> Self {
        Self {
            element,
            selector,
            document,
            interrupt: RefCell::new(None),
        }
    }

    /// Skip this invocation.
    ///
    /// The skip is recorded immediately and wins over anything the body
    /// does afterwards. The returned error lets the body stop early:
    /// `return Err(ctx.skip());`
    #[must_use]
    pub fn skip(&self) -> TestError {
        self.record(Interrupt::Skip);
        TestError::Skipped
    }

    /// Mark this invocation todo, with an optional reason
    #[must_use]
    pub fn todo(&self, reason: Option<&str>) -> TestError {
        let reason = reason.map(str::to_string);
        self.record(Interrupt::Todo(reason.clone()));
        TestError::Todo(reason)
    }

    fn record(&self, interrupt: Interrupt) {
        let mut slot = self.interrupt.borrow_mut();
        if slot.is_none() {
            *slot = Some(interrupt);
        }
    }

    /// First interrupt recorded, if any
    #[must_use]
    pub fn interrupt(&self) -> Option<Interrupt> {
        self.interrupt.borrow().clone()
    }

    /// Selector that re-resolves to this element
    #[must_use]
    pub fn element_selector(&self) -> String {
        generate_selector(&self.element)
    }
}
