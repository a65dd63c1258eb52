//! Result records produced by a run.
//!
//! A [`TestResult`] is terminal once created. A [`SuiteResult`] is always
//! built through [`SuiteResult::from_tests`], so its counters are derived
//! from the recorded outcomes and `passed + failed + skipped + todo`
//! equals `tests.len()`.

use crate::config::RunnerConfig;
use crate::dom::Element;
use crate::selector::generate_selector;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Terminal classification of one (element, test) execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Test passed
    Pass,
    /// Test failed
    Fail,
    /// Test was skipped
    Skip,
    /// Test is marked todo
    Todo,
}

impl Outcome {
    /// Check if outcome is passing
    #[must_use]
    pub const fn is_pass(self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Check if outcome is failing
    #[must_use]
    pub const fn is_fail(self) -> bool {
        matches!(self, Self::Fail)
    }

    /// Lower-case label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Skip => "skip",
            Self::Todo => "todo",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a test failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// An expectation did not hold
    Assertion,
    /// The body did not settle within the configured timeout
    Timeout,
    /// The body panicked
    Panic,
    /// `before_each` failed, the body was not run
    Hook,
    /// The body returned a custom failure
    Error,
}

/// Failure details attached to every `fail` outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    /// Failure category
    pub kind: FailureKind,
    /// Message, verbatim from the source of the failure
    pub message: String,
}

impl FailureInfo {
    /// Create failure info
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Snapshot of an element taken at test time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    /// Selector that re-resolves to the element
    pub selector: String,
    /// Upper-case tag name
    pub tag_name: String,
    /// Text content, truncated
    pub text_content: String,
    /// Outer HTML, truncated
    #[serde(rename = "outerHTML")]
    pub outer_html: String,
}

impl ElementInfo {
    /// Capture a bounded snapshot of `element`
    #[must_use]
    pub fn capture(element: &Element<'_>, config: &RunnerConfig) -> Self {
        Self {
            selector: generate_selector(element),
            tag_name: element.tag_name(),
            text_content: truncate(
                element.text_content().trim(),
                config.max_text_content_length,
            ),
            outer_html: truncate(&element.outer_html(), config.max_outer_html_length),
        }
    }
}

/// Cut `text` to at most `max` characters, marking the cut with `...`
#[must_use]
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
        None => text.to_string(),
    }
}

pub(crate) mod duration_ms {
    use super::{Deserialize, Deserializer, Duration, Serializer};
    use serde::de::Error;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(ms.max(0.0) / 1000.0).map_err(D::Error::custom)
    }
}

/// Result of one (element, test) execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Unique id
    pub id: String,
    /// Owning suite name
    pub suite: String,
    /// Test name
    pub name: String,
    /// Outcome
    pub outcome: Outcome,
    /// Human-readable message
    pub message: String,
    /// Execution time, hooks included
    #[serde(with = "duration_ms")]
    pub duration: Duration,
    /// Present if and only if the outcome is `fail`
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<FailureInfo>,
    /// Element snapshot, when element info is stored
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub element: Option<ElementInfo>,
}

impl TestResult {
    fn base(suite: &str, name: &str, outcome: Outcome, message: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            suite: suite.to_string(),
            name: name.to_string(),
            outcome,
            message,
            duration: Duration::ZERO,
            error: None,
            element: None,
        }
    }

    /// Create a passing result
    #[must_use]
    pub fn pass(suite: &str, name: &str) -> Self {
        Self::base(suite, name, Outcome::Pass, "Test passed".to_string())
    }

    /// Create a failing result
    #[must_use]
    pub fn fail(suite: &str, name: &str, failure: FailureInfo) -> Self {
        let mut result = Self::base(suite, name, Outcome::Fail, failure.message.clone());
        result.error = Some(failure);
        result
    }

    /// Create a skipped result
    #[must_use]
    pub fn skip(suite: &str, name: &str) -> Self {
        Self::base(suite, name, Outcome::Skip, "Test skipped".to_string())
    }

    /// Create a todo result
    #[must_use]
    pub fn todo(suite: &str, name: &str, reason: Option<&str>) -> Self {
        let message = reason.map_or_else(|| "Test marked as todo".to_string(), str::to_string);
        Self::base(suite, name, Outcome::Todo, message)
    }

    /// Set duration
    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Attach an element snapshot
    #[must_use]
    pub fn with_element(mut self, element: Option<ElementInfo>) -> Self {
        self.element = element;
        self
    }

    /// Whether this failure came from the timeout race
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.error
            .as_ref()
            .is_some_and(|e| e.kind == FailureKind::Timeout)
    }
}

/// Aggregated results of one suite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteResult {
    /// Suite name
    pub name: String,
    /// Results in execution order
    pub tests: Vec<TestResult>,
    /// Wall time of the suite
    #[serde(with = "duration_ms")]
    pub duration: Duration,
    /// Passed count
    pub passed: usize,
    /// Failed count (timeouts included)
    pub failed: usize,
    /// Skipped count
    pub skipped: usize,
    /// Todo count
    pub todo: usize,
    /// Failures caused by the timeout race (subset of `failed`)
    pub timeout: usize,
    /// `after_each` failures counted under `AfterEachPolicy::Count`
    #[serde(default)]
    pub hook_failures: usize,
    /// Orchestration error that emptied this suite
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl SuiteResult {
    /// Build a suite result, deriving every counter from `tests`
    #[must_use]
    pub fn from_tests(name: impl Into<String>, tests: Vec<TestResult>, duration: Duration) -> Self {
        let count = |outcome: Outcome| tests.iter().filter(|t| t.outcome == outcome).count();
        Self {
            name: name.into(),
            passed: count(Outcome::Pass),
            failed: count(Outcome::Fail),
            skipped: count(Outcome::Skip),
            todo: count(Outcome::Todo),
            timeout: tests.iter().filter(|t| t.is_timeout()).count(),
            hook_failures: 0,
            error: None,
            tests,
            duration,
        }
    }

    /// A suite that could not execute
    #[must_use]
    pub fn errored(name: impl Into<String>, message: impl Into<String>, duration: Duration) -> Self {
        let mut result = Self::from_tests(name, Vec::new(), duration);
        result.error = Some(message.into());
        result
    }

    /// Total recorded results
    #[must_use]
    pub fn total(&self) -> usize {
        self.tests.len()
    }

    /// Check if no test failed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Failing results
    #[must_use]
    pub fn failures(&self) -> Vec<&TestResult> {
        self.tests.iter().filter(|t| t.outcome.is_fail()).collect()
    }
}

/// Totals across suites
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of suites
    pub suites: usize,
    /// Total results
    pub total: usize,
    /// Passed
    pub passed: usize,
    /// Failed (timeouts included)
    pub failed: usize,
    /// Skipped
    pub skipped: usize,
    /// Todo
    pub todo: usize,
    /// Timeouts
    pub timeout: usize,
    /// Suites emptied by an orchestration error
    pub errored_suites: usize,
}

impl RunSummary {
    /// Aggregate suite results
    #[must_use]
    pub fn from_results(results: &[SuiteResult]) -> Self {
        results.iter().fold(
            Self {
                suites: results.len(),
                ..Self::default()
            },
            |mut acc, suite| {
                acc.total += suite.total();
                acc.passed += suite.passed;
                acc.failed += suite.failed;
                acc.skipped += suite.skipped;
                acc.todo += suite.todo;
                acc.timeout += suite.timeout;
                acc.errored_suites += usize::from(suite.error.is_some());
                acc
            },
        )
    }

    /// Check if nothing failed
    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0 && self.errored_suites == 0
    }

    /// Pass rate over executed (pass or fail) results, 1.0 when none ran
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        let executed = self.passed + self.failed;
        if executed == 0 {
            return 1.0;
        }
        self.passed as f64 / executed as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use proptest::prelude::*;

    fn sample() -> Vec<TestResult> {
        vec![
            TestResult::pass("s", "a"),
            TestResult::fail("s", "b", FailureInfo::new(FailureKind::Assertion, "nope")),
            TestResult::fail("s", "c", FailureInfo::new(FailureKind::Timeout, "slow")),
            TestResult::skip("s", "d"),
            TestResult::todo("s", "e", Some("later")),
        ]
    }

    #[test]
    fn test_suite_counts_partition_tests() {
        let suite = SuiteResult::from_tests("s", sample(), Duration::from_millis(3));
        assert_eq!(suite.passed, 1);
        assert_eq!(suite.failed, 2);
        assert_eq!(suite.skipped, 1);
        assert_eq!(suite.todo, 1);
        assert_eq!(suite.timeout, 1);
        assert_eq!(
            suite.passed + suite.failed + suite.skipped + suite.todo,
            suite.tests.len()
        );
        assert_eq!(suite.failures().len(), 2);
    }

    #[test]
    fn test_error_present_only_on_fail() {
        for result in sample() {
            assert_eq!(result.error.is_some(), result.outcome.is_fail());
        }
    }

    #[test]
    fn test_todo_message() {
        assert_eq!(TestResult::todo("s", "t", None).message, "Test marked as todo");
        assert_eq!(TestResult::todo("s", "t", Some("wip")).message, "wip");
    }

    #[test]
    fn test_ids_are_unique() {
        let a = TestResult::pass("s", "t");
        let b = TestResult::pass("s", "t");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_errored_suite_is_empty() {
        let suite = SuiteResult::errored("s", "bad selector", Duration::ZERO);
        assert_eq!(suite.total(), 0);
        assert_eq!(suite.error.as_deref(), Some("bad selector"));
    }

    #[test]
    fn test_run_summary() {
        let suites = vec![
            SuiteResult::from_tests("a", sample(), Duration::ZERO),
            SuiteResult::errored("b", "boom", Duration::ZERO),
        ];
        let summary = RunSummary::from_results(&suites);
        assert_eq!(summary.suites, 2);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.errored_suites, 1);
        assert!(!summary.all_passed());
        assert!((summary.pass_rate() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_serialized_shape() {
        let result = TestResult::pass("s", "t").with_duration(Duration::from_millis(12));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["outcome"], "pass");
        assert_eq!(json["duration"], 12.0);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_duration_out_of_range_is_rejected() {
        let mut json = serde_json::to_value(TestResult::pass("s", "t")).unwrap();
        json["duration"] = serde_json::json!(12.5);
        let parsed: TestResult = serde_json::from_value(json.clone()).unwrap();
        assert!((parsed.duration.as_secs_f64() * 1000.0 - 12.5).abs() < 1e-6);

        json["duration"] = serde_json::json!(1e300);
        assert!(serde_json::from_value::<TestResult>(json).is_err());
    }

    #[test]
    fn test_element_info_capture() {
        let doc = Document::parse(r#"<body><p id="intro">  Hello world, this is long  </p></body>"#);
        let p = doc.query_selector("p").unwrap().unwrap();
        let config = RunnerConfig::builder()
            .max_text_content_length(5)
            .max_outer_html_length(8)
            .build();
        let info = ElementInfo::capture(&p, &config);
        assert_eq!(info.selector, "#intro");
        assert_eq!(info.tag_name, "P");
        assert_eq!(info.text_content, "Hello...");
        assert_eq!(info.outer_html, "<p id=\"i...");
        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("outerHTML").is_some());
        assert!(json.get("tagName").is_some());
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("héllo", 2), "hé...");
        assert_eq!(truncate("abc", 3), "abc");
        assert_eq!(truncate("", 0), "");
    }

    proptest! {
        #[test]
        fn prop_truncate_bounded(text in ".{0,64}", max in 0usize..32) {
            let out = truncate(&text, max);
            let chars = text.chars().count();
            if chars <= max {
                prop_assert_eq!(out, text);
            } else {
                prop_assert_eq!(out.chars().count(), max + 3);
                prop_assert!(out.ends_with("..."));
            }
        }
    }
}
