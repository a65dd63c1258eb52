//! Typed event stream emitted during a run.
//!
//! Events are one-shot broadcasts: each listener registered at emission
//! time sees an event at most once, and nothing is buffered for listeners
//! that subscribe later.

use crate::dom::Element;
use crate::outcome::{SuiteResult, TestResult};
use serde::Serialize;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

/// Milliseconds since the unix epoch
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Event emitted by the runner
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "type")]
pub enum TestEvent<'a> {
    /// Run started
    #[serde(rename = "test-start")]
    Start {
        /// Emission time
        timestamp: i64,
        /// Number of suites selected for the run
        suites: usize,
    },
    /// A suite finished
    #[serde(rename = "test-progress")]
    Progress {
        /// Emission time
        timestamp: i64,
        /// The finished suite
        suite: &'a SuiteResult,
        /// Suites finished so far
        completed: usize,
        /// Suites selected for the run
        total: usize,
    },
    /// One (element, test) pair produced a result
    #[serde(rename = "test-result")]
    Result {
        /// Emission time
        timestamp: i64,
        /// Owning suite name
        suite: &'a str,
        /// The result
        result: &'a TestResult,
        /// Live element the result was produced for
        #[serde(skip)]
        element: Option<Element<'a>>,
    },
    /// Run finished
    #[serde(rename = "test-complete")]
    Complete {
        /// Emission time
        timestamp: i64,
        /// Every suite result of the run
        results: &'a [SuiteResult],
    },
    /// Orchestration failure outside user test code
    #[serde(rename = "test-error")]
    Error {
        /// Emission time
        timestamp: i64,
        /// Affected suite, if any
        suite: Option<&'a str>,
        /// Error description
        message: &'a str,
    },
}

impl TestEvent<'_> {
    /// Emission time in unix milliseconds
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        match self {
            Self::Start { timestamp, .. }
            | Self::Progress { timestamp, .. }
            | Self::Result { timestamp, .. }
            | Self::Complete { timestamp, .. }
            | Self::Error { timestamp, .. } => *timestamp,
        }
    }

    /// Wire tag of the event
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Start { .. } => "test-start",
            Self::Progress { .. } => "test-progress",
            Self::Result { .. } => "test-result",
            Self::Complete { .. } => "test-complete",
            Self::Error { .. } => "test-error",
        }
    }
}

/// Event listener
pub type Listener = Rc<dyn Fn(&TestEvent<'_>)>;

/// Handle returned by [`EventBus::on`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Fan-out of events to registered listeners
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventBus {
    /// Create an empty bus
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a listener
    pub fn on<F>(&mut self, listener: F) -> ListenerId
    where
        F: Fn(&TestEvent<'_>) + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Rc::new(listener)));
        id
    }

    /// Unsubscribe; returns whether the listener was registered
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Number of listeners
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether there are no listeners
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver `event` to every listener in registration order.
    ///
    /// A panicking listener is logged and skipped; delivery continues.
    pub fn emit(&self, event: &TestEvent<'_>) {
        for (id, listener) in &self.listeners {
            let delivered = catch_unwind(AssertUnwindSafe(|| listener(event)));
            if delivered.is_err() {
                tracing::warn!(
                    listener = id.0,
                    event = event.kind(),
                    "event listener panicked; continuing delivery"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::time::Duration;

    #[test]
    fn test_serialized_tags() {
        let suite = SuiteResult::from_tests("s", Vec::new(), Duration::ZERO);
        let results = vec![suite];
        let event = TestEvent::Complete {
            timestamp: 1,
            results: &results,
        };
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["type"], "test-complete");
        assert_eq!(json["results"][0]["name"], "s");

        let start = TestEvent::Start {
            timestamp: 2,
            suites: 3,
        };
        assert_eq!(serde_json::to_value(start).unwrap()["type"], "test-start");
        assert_eq!(start.kind(), "test-start");
        assert_eq!(start.timestamp(), 2);
    }

    #[test]
    fn test_result_event_skips_element() {
        let result = TestResult::pass("s", "t");
        let event = TestEvent::Result {
            timestamp: 0,
            suite: "s",
            result: &result,
            element: None,
        };
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["type"], "test-result");
        assert!(json.get("element").is_none());
        assert_eq!(json["result"]["outcome"], "pass");
    }

    #[test]
    fn test_listeners_in_registration_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        for tag in ["first", "second"] {
            let seen = Rc::clone(&seen);
            bus.on(move |_| seen.borrow_mut().push(tag));
        }
        bus.emit(&TestEvent::Start {
            timestamp: 0,
            suites: 0,
        });
        assert_eq!(*seen.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = EventBus::new();
        bus.on(|_| panic!("listener bug"));
        let counter = Rc::clone(&count);
        bus.on(move |_| *counter.borrow_mut() += 1);
        bus.emit(&TestEvent::Start {
            timestamp: 0,
            suites: 0,
        });
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_off_unsubscribes() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = EventBus::new();
        let counter = Rc::clone(&count);
        let id = bus.on(move |_| *counter.borrow_mut() += 1);
        assert!(bus.off(id));
        assert!(!bus.off(id));
        bus.emit(&TestEvent::Start {
            timestamp: 0,
            suites: 0,
        });
        assert_eq!(*count.borrow(), 0);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_now_millis_is_recent() {
        assert!(now_millis() > 1_600_000_000_000);
    }
}
