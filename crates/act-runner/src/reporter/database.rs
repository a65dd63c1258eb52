//! Persistence payload for an external result store.
//!
//! The payload shape is the compatibility contract with the store:
//!
//! ```text
//! { url, test_type,
//!   results: [{ rule_id, outcome: passed|failed|inapplicable, elements? }],
//!   summary: { total, passed, failed, inapplicable },
//!   timestamp }
//! ```
//!
//! One rule entry is produced per suite, keyed by the suite name.

use super::Reporter;
use crate::outcome::{ElementInfo, Outcome, SuiteResult};
use crate::result::RunnerResult;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default `test_type` tag
pub const ACCESSIBILITY_TEST_TYPE: &str = "accessibility";

/// Rule-level verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleOutcome {
    /// At least one test passed and none failed
    Passed,
    /// At least one test failed
    Failed,
    /// Nothing applicable ran
    Inapplicable,
}

impl RuleOutcome {
    /// Verdict for one suite
    #[must_use]
    pub fn of(suite: &SuiteResult) -> Self {
        if suite.failed > 0 {
            Self::Failed
        } else if suite.passed > 0 {
            Self::Passed
        } else {
            Self::Inapplicable
        }
    }
}

/// One rule in the payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleResult {
    /// Rule id, the suite name
    pub rule_id: String,
    /// Verdict
    pub outcome: RuleOutcome,
    /// Snapshots of failing elements
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub elements: Option<Vec<ElementInfo>>,
}

/// Payload totals, counted in rules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadSummary {
    /// Rules reported
    pub total: usize,
    /// Rules passed
    pub passed: usize,
    /// Rules failed
    pub failed: usize,
    /// Rules inapplicable
    pub inapplicable: usize,
}

/// Record handed to a [`ResultSink`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabasePayload {
    /// Audited page
    pub url: String,
    /// Kind of audit
    pub test_type: String,
    /// Per-rule verdicts
    pub results: Vec<RuleResult>,
    /// Totals
    pub summary: PayloadSummary,
    /// RFC 3339 creation time
    pub timestamp: String,
}

impl DatabasePayload {
    /// Build the payload for a finished run
    #[must_use]
    pub fn from_results(url: &str, test_type: &str, results: &[SuiteResult]) -> Self {
        let rules: Vec<RuleResult> = results
            .iter()
            .map(|suite| {
                let elements: Vec<ElementInfo> = suite
                    .tests
                    .iter()
                    .filter(|t| t.outcome == Outcome::Fail)
                    .filter_map(|t| t.element.clone())
                    .collect();
                RuleResult {
                    rule_id: suite.name.clone(),
                    outcome: RuleOutcome::of(suite),
                    elements: (!elements.is_empty()).then_some(elements),
                }
            })
            .collect();

        let count = |outcome: RuleOutcome| rules.iter().filter(|r| r.outcome == outcome).count();
        let summary = PayloadSummary {
            total: rules.len(),
            passed: count(RuleOutcome::Passed),
            failed: count(RuleOutcome::Failed),
            inapplicable: count(RuleOutcome::Inapplicable),
        };

        Self {
            url: url.to_string(),
            test_type: test_type.to_string(),
            results: rules,
            summary,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// External store for payloads (queue, RPC, database)
pub trait ResultSink {
    /// Accept one payload
    fn send(&self, payload: &DatabasePayload) -> RunnerResult<()>;
}

impl<F> ResultSink for F
where
    F: Fn(&DatabasePayload) -> RunnerResult<()>,
{
    fn send(&self, payload: &DatabasePayload) -> RunnerResult<()> {
        self(payload)
    }
}

/// Forwards each finished run to a [`ResultSink`]
#[derive(Debug)]
pub struct DatabaseReporter<S> {
    sink: S,
    url: String,
    test_type: String,
}

impl<S: ResultSink> DatabaseReporter<S> {
    /// Report runs against `url` to `sink`
    #[must_use]
    pub fn new(sink: S, url: impl Into<String>) -> Self {
        Self {
            sink,
            url: url.into(),
            test_type: ACCESSIBILITY_TEST_TYPE.to_string(),
        }
    }

    /// Override the `test_type` tag
    #[must_use]
    pub fn with_test_type(mut self, test_type: impl Into<String>) -> Self {
        self.test_type = test_type.into();
        self
    }
}

impl<S: ResultSink> Reporter for DatabaseReporter<S> {
    fn name(&self) -> &str {
        "database"
    }

    fn on_complete(&self, results: &[SuiteResult]) -> RunnerResult<()> {
        let payload = DatabasePayload::from_results(&self.url, &self.test_type, results);
        debug!(url = %payload.url, rules = payload.summary.total, "sending results");
        self.sink.send(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{FailureInfo, FailureKind, TestResult};
    use crate::result::RunnerError;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn snapshot(selector: &str) -> ElementInfo {
        ElementInfo {
            selector: selector.to_string(),
            tag_name: "IMG".to_string(),
            text_content: String::new(),
            outer_html: "<img>".to_string(),
        }
    }

    fn results() -> Vec<SuiteResult> {
        let failing = TestResult::fail(
            "23a2a8",
            "image has accessible name",
            FailureInfo::new(FailureKind::Assertion, "missing"),
        )
        .with_element(Some(snapshot("body > img:nth-child(2)")));
        let passing = TestResult::pass("23a2a8", "image has accessible name")
            .with_element(Some(snapshot("#logo")));
        vec![
            SuiteResult::from_tests("23a2a8", vec![passing, failing], Duration::ZERO),
            SuiteResult::from_tests(
                "2779a5",
                vec![TestResult::pass("2779a5", "document has title")],
                Duration::ZERO,
            ),
            SuiteResult::from_tests(
                "b4f0c3",
                vec![TestResult::skip("b4f0c3", "meta viewport allows zoom")],
                Duration::ZERO,
            ),
        ]
    }

    #[test]
    fn test_payload_shape() {
        let payload = DatabasePayload::from_results("https://example.test/", "accessibility", &results());
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["url"], "https://example.test/");
        assert_eq!(json["test_type"], "accessibility");
        assert_eq!(json["results"][0]["rule_id"], "23a2a8");
        assert_eq!(json["results"][0]["outcome"], "failed");
        assert_eq!(
            json["results"][0]["elements"][0]["selector"],
            "body > img:nth-child(2)"
        );
        assert_eq!(json["results"][1]["outcome"], "passed");
        assert!(json["results"][1].get("elements").is_none());
        assert_eq!(json["results"][2]["outcome"], "inapplicable");
        assert_eq!(
            json["summary"],
            serde_json::json!({"total": 3, "passed": 1, "failed": 1, "inapplicable": 1})
        );
    }

    #[test]
    fn test_reporter_sends_to_sink() {
        let sent = Rc::new(RefCell::new(Vec::new()));
        let store = Rc::clone(&sent);
        let reporter = DatabaseReporter::new(
            move |payload: &DatabasePayload| {
                store.borrow_mut().push(payload.clone());
                Ok(())
            },
            "https://example.test/",
        )
        .with_test_type("a11y");

        reporter.on_complete(&results()).unwrap();

        let sent = sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].test_type, "a11y");
        assert_eq!(sent[0].summary.total, 3);
    }

    #[test]
    fn test_sink_errors_surface_to_caller() {
        let reporter = DatabaseReporter::new(
            |_: &DatabasePayload| {
                Err(RunnerError::Sink {
                    message: "queue unavailable".into(),
                })
            },
            "https://example.test/",
        );
        let err = reporter.on_complete(&results()).unwrap_err();
        assert_eq!(err.to_string(), "Result sink error: queue unavailable");
    }
}
