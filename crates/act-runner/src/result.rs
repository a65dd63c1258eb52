//! Result and error types for act-runner.
//!
//! These are orchestration errors. Test failures are data (see
//! [`crate::outcome`]) and never travel through this type.

use thiserror::Error;

/// Result type for runner operations
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that can occur outside of user test code
#[derive(Debug, Error)]
pub enum RunnerError {
    /// CSS selector failed to parse
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector {
        /// The selector text
        selector: String,
        /// Parser message
        message: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Invalid state error (operation called in wrong state)
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// Configuration could not be loaded
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// External result sink rejected a payload
    #[error("Result sink error: {message}")]
    Sink {
        /// Error message
        message: String,
    },

    /// Reporter failed to produce output
    #[error("Reporter error: {message}")]
    Reporter {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl RunnerError {
    /// Build an [`RunnerError::InvalidSelector`]
    #[must_use]
    pub fn invalid_selector(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_selector_display() {
        let err = RunnerError::invalid_selector("div[", "unexpected end of input");
        assert_eq!(
            err.to_string(),
            "Invalid selector 'div[': unexpected end of input"
        );
    }

    #[test]
    fn test_timeout_display() {
        let err = RunnerError::Timeout { ms: 1000 };
        assert_eq!(err.to_string(), "Operation timed out after 1000ms");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: RunnerError = io.into();
        assert!(matches!(err, RunnerError::Io(_)));
    }
}
