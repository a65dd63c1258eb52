//! Runner configuration.
//!
//! Read once when the runner is constructed and never mutated during a
//! run. Loadable from YAML or JSON; missing keys take their defaults.

use crate::result::{RunnerError, RunnerResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default per-test timeout (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default cap on captured text content
pub const DEFAULT_MAX_TEXT_CONTENT_LENGTH: usize = 200;

/// Default cap on captured outer HTML
pub const DEFAULT_MAX_OUTER_HTML_LENGTH: usize = 500;

/// What to do when an `after_each` hook fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AfterEachPolicy {
    /// Log a warning only
    #[default]
    Log,
    /// Log and count into `SuiteResult::hook_failures`
    Count,
}

/// Configuration for the runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Per-test timeout in milliseconds
    pub timeout_ms: u64,
    /// Stop scheduling tests after the first failure
    pub bail: bool,
    /// Cap on `ElementInfo::text_content`
    pub max_text_content_length: usize,
    /// Cap on `ElementInfo::outer_html`
    pub max_outer_html_length: usize,
    /// Attach element snapshots to results
    pub store_element_info: bool,
    /// Handling of `after_each` failures
    pub after_each_policy: AfterEachPolicy,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            bail: false,
            max_text_content_length: DEFAULT_MAX_TEXT_CONTENT_LENGTH,
            max_outer_html_length: DEFAULT_MAX_OUTER_HTML_LENGTH,
            store_element_info: true,
            after_each_policy: AfterEachPolicy::Log,
        }
    }
}

impl RunnerConfig {
    /// Create a new builder
    #[must_use]
    pub fn builder() -> RunnerConfigBuilder {
        RunnerConfigBuilder::default()
    }

    /// Timeout as a [`Duration`]
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parse from YAML
    pub fn from_yaml_str(yaml: &str) -> RunnerResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Parse from JSON
    pub fn from_json_str(json: &str) -> RunnerResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a `.yaml`/`.yml` or `.json` file
    pub fn from_file(path: &Path) -> RunnerResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&contents),
            Some("json") => Self::from_json_str(&contents),
            other => Err(RunnerError::Config {
                message: format!(
                    "unsupported config extension {:?} for {}",
                    other.unwrap_or(""),
                    path.display()
                ),
            }),
        }
    }
}

/// Builder for [`RunnerConfig`]
#[derive(Debug, Clone, Default)]
pub struct RunnerConfigBuilder {
    config: RunnerConfig,
}

impl RunnerConfigBuilder {
    /// Set the per-test timeout in milliseconds
    #[must_use]
    pub const fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    /// Enable/disable bail-on-first-failure
    #[must_use]
    pub const fn bail(mut self, enabled: bool) -> Self {
        self.config.bail = enabled;
        self
    }

    /// Set the text content cap
    #[must_use]
    pub const fn max_text_content_length(mut self, max: usize) -> Self {
        self.config.max_text_content_length = max;
        self
    }

    /// Set the outer HTML cap
    #[must_use]
    pub const fn max_outer_html_length(mut self, max: usize) -> Self {
        self.config.max_outer_html_length = max;
        self
    }

    /// Enable/disable element snapshots
    #[must_use]
    pub const fn store_element_info(mut self, enabled: bool) -> Self {
        self.config.store_element_info = enabled;
        self
    }

    /// Set the `after_each` failure policy
    #[must_use]
    pub const fn after_each_policy(mut self, policy: AfterEachPolicy) -> Self {
        self.config.after_each_policy = policy;
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> RunnerConfig {
        self.config
    }
}
