//! Human-readable console summary.

use super::Reporter;
use crate::event::TestEvent;
use crate::outcome::{Outcome, RunSummary, SuiteResult};
use crate::result::RunnerResult;
use console::{style, Style, Term};

/// Prints per-suite lines and an aggregate line once a run completes
#[derive(Debug)]
pub struct ConsoleReporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Print each failure as it happens and list failures per suite
    pub verbose: bool,
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ConsoleReporter {
    /// Create a reporter writing to stdout
    #[must_use]
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self {
            term: Term::stdout(),
            use_color,
            verbose,
        }
    }

    /// Write to stderr instead
    #[must_use]
    pub fn to_stderr(mut self) -> Self {
        self.term = Term::stderr();
        self
    }

    fn marker(&self, label: &'static str, symbol: &'static str, paint: fn(&str) -> String) -> String {
        if self.use_color {
            paint(symbol)
        } else {
            label.to_string()
        }
    }

    fn suite_line(&self, suite: &SuiteResult) -> String {
        if let Some(error) = &suite.error {
            let prefix = self.marker("ERROR", "!", |s| style(s).yellow().bold().to_string());
            return format!("{prefix} {}: {error}", suite.name);
        }
        let prefix = if suite.all_passed() {
            self.marker("PASS", "✓", |s| style(s).green().bold().to_string())
        } else {
            self.marker("FAIL", "✗", |s| style(s).red().bold().to_string())
        };
        format!(
            "{prefix} {} {} tests in {:.1}ms ({} passed, {} failed, {} skipped, {} todo, {} timeout)",
            suite.name,
            suite.total(),
            suite.duration.as_secs_f64() * 1000.0,
            suite.passed,
            suite.failed,
            suite.skipped,
            suite.todo,
            suite.timeout,
        )
    }

    fn aggregate_line(&self, summary: &RunSummary) -> String {
        let counts = format!(
            "{} passed, {} failed, {} skipped, {} todo, {} timeout",
            summary.passed, summary.failed, summary.skipped, summary.todo, summary.timeout
        );
        let status = if summary.all_passed() { "PASSED" } else { "FAILED" };
        if self.use_color {
            let status_style = if summary.all_passed() {
                Style::new().green().bold()
            } else {
                Style::new().red().bold()
            };
            format!(
                "{} {} tests in {} suites ({counts})",
                status_style.apply_to(status),
                summary.total,
                summary.suites
            )
        } else {
            format!(
                "{status} {} tests in {} suites ({counts})",
                summary.total, summary.suites
            )
        }
    }

    /// Render the full summary without writing it
    #[must_use]
    pub fn render_summary(&self, results: &[SuiteResult]) -> String {
        let mut lines = Vec::with_capacity(results.len() + 2);
        for suite in results {
            lines.push(self.suite_line(suite));
            if self.verbose {
                for failure in suite.failures() {
                    lines.push(format!("    - {}: {}", failure.name, failure.message));
                }
            }
        }
        if !results.is_empty() {
            lines.push(String::new());
        }
        lines.push(self.aggregate_line(&RunSummary::from_results(results)));
        lines.join("\n")
    }
}

impl Reporter for ConsoleReporter {
    fn name(&self) -> &str {
        "console"
    }

    fn on_event(&self, event: &TestEvent<'_>) -> RunnerResult<()> {
        if !self.verbose {
            return Ok(());
        }
        match event {
            TestEvent::Result { result, .. } if result.outcome == Outcome::Fail => {
                let prefix = self.marker("FAIL", "✗", |s| style(s).red().to_string());
                self.term
                    .write_line(&format!("{prefix} {} › {}: {}", result.suite, result.name, result.message))?;
            }
            TestEvent::Error { message, .. } => {
                let prefix = self.marker("ERROR", "!", |s| style(s).yellow().to_string());
                self.term.write_line(&format!("{prefix} {message}"))?;
            }
            _ => {}
        }
        Ok(())
    }

    fn on_complete(&self, results: &[SuiteResult]) -> RunnerResult<()> {
        self.term.write_line("")?;
        self.term.write_line(&self.render_summary(results))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{FailureInfo, FailureKind, TestResult};
    use std::time::Duration;

    fn results() -> Vec<SuiteResult> {
        let tests = vec![
            TestResult::pass("image-alt", "has alt"),
            TestResult::fail(
                "image-alt",
                "has alt",
                FailureInfo::new(FailureKind::Assertion, "Expected element to have attribute \"alt\""),
            ),
            TestResult::fail(
                "image-alt",
                "slow",
                FailureInfo::new(FailureKind::Timeout, "Test timed out after 10ms"),
            ),
        ];
        vec![
            SuiteResult::from_tests("image-alt", tests, Duration::from_millis(2)),
            SuiteResult::errored("broken", "Invalid selector 'div[': bad", Duration::ZERO),
        ]
    }

    #[test]
    fn test_plain_summary() {
        let reporter = ConsoleReporter::new(false, false);
        let text = reporter.render_summary(&results());
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("FAIL image-alt 3 tests"));
        assert!(lines[0].ends_with("(1 passed, 2 failed, 0 skipped, 0 todo, 1 timeout)"));
        assert_eq!(lines[1], "ERROR broken: Invalid selector 'div[': bad");
        assert_eq!(
            lines[3],
            "FAILED 3 tests in 2 suites (1 passed, 2 failed, 0 skipped, 0 todo, 1 timeout)"
        );
    }

    #[test]
    fn test_verbose_lists_failures() {
        let reporter = ConsoleReporter::new(false, true);
        let text = reporter.render_summary(&results());
        assert!(text.contains("    - slow: Test timed out after 10ms"));
    }

    #[test]
    fn test_empty_run() {
        let reporter = ConsoleReporter::new(false, false);
        assert_eq!(
            reporter.render_summary(&[]),
            "PASSED 0 tests in 0 suites (0 passed, 0 failed, 0 skipped, 0 todo, 0 timeout)"
        );
    }
}
