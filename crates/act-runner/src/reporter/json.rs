//! JSON report of a finished run.

use super::Reporter;
use crate::outcome::{RunSummary, SuiteResult};
use crate::result::RunnerResult;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Where the report goes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JsonDestination {
    /// Emit through `tracing` at info level
    #[default]
    Log,
    /// Write to a file, replacing any previous report
    File(PathBuf),
}

/// Serialized report shape
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport<'a> {
    /// RFC 3339 creation time
    pub timestamp: String,
    /// Aggregate counts
    pub summary: RunSummary,
    /// Every suite result
    pub suites: &'a [SuiteResult],
}

impl<'a> JsonReport<'a> {
    /// Build a report stamped with the current time
    #[must_use]
    pub fn new(results: &'a [SuiteResult]) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: RunSummary::from_results(results),
            suites: results,
        }
    }
}

/// Serializes the final results as JSON
#[derive(Debug, Clone, Default)]
pub struct JsonReporter {
    destination: JsonDestination,
    pretty: bool,
}

impl JsonReporter {
    /// Report to `destination`, pretty-printed
    #[must_use]
    pub const fn new(destination: JsonDestination) -> Self {
        Self {
            destination,
            pretty: true,
        }
    }

    /// Report to a file
    #[must_use]
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self::new(JsonDestination::File(path.into()))
    }

    /// Compact single-line output
    #[must_use]
    pub const fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    /// Render the report text
    pub fn render(&self, results: &[SuiteResult]) -> RunnerResult<String> {
        let report = JsonReport::new(results);
        let text = if self.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };
        Ok(text)
    }
}

impl Reporter for JsonReporter {
    fn name(&self) -> &str {
        "json"
    }

    fn on_complete(&self, results: &[SuiteResult]) -> RunnerResult<()> {
        let text = self.render(results)?;
        match &self.destination {
            JsonDestination::Log => info!(report = %text, "json report"),
            JsonDestination::File(path) => {
                std::fs::write(path, text)?;
                info!(path = %path.display(), "json report written");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::TestResult;
    use std::time::Duration;

    fn results() -> Vec<SuiteResult> {
        vec![SuiteResult::from_tests(
            "document-title",
            vec![TestResult::pass("document-title", "has title")],
            Duration::from_millis(1),
        )]
    }

    #[test]
    fn test_render_shape() {
        let text = JsonReporter::default().compact().render(&results()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["summary"]["passed"], 1);
        assert_eq!(value["suites"][0]["name"], "document-title");
        assert_eq!(value["suites"][0]["tests"][0]["outcome"], "pass");
        assert!(chrono::DateTime::parse_from_rfc3339(value["timestamp"].as_str().unwrap()).is_ok());
        assert!(!text.contains('\n'));
    }

    #[test]
    fn test_file_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let reporter = JsonReporter::to_file(&path);

        reporter.on_complete(&results()).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["summary"]["total"], 1);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = JsonReporter::to_file(dir.path().join("missing").join("report.json"));
        assert!(reporter.on_complete(&results()).is_err());
    }
}
