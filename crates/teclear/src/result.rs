//! Result and error types for Teclear.

use thiserror::Error;

/// Result type for Teclear operations
pub type TeclearResult<T> = Result<T, TeclearError>;

/// Errors that can occur in Teclear
#[derive(Debug, Error)]
pub enum TeclearError {
    /// Locator resolved to zero elements within the discovery timeout
    #[error("No element found for locator: {locator}")]
    ElementNotFound {
        /// Locator description
        locator: String,
    },

    /// Locator resolved to more than one element in strict mode
    #[error("Locator {locator} is ambiguous: {count} elements matched")]
    AmbiguousLocator {
        /// Locator description
        locator: String,
        /// Number of elements that matched
        count: usize,
    },

    /// A bounded wait (readiness, read-back, barrier) exceeded its timeout
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// All input strategies were exhausted without the element converging
    #[error("Value mismatch after all strategies: expected {expected:?}, got {actual:?}")]
    ValueMismatch {
        /// The value the caller wanted reflected in the element
        expected: String,
        /// The value actually read back from the element
        actual: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// An automation capability action failed
    #[error("Automation capability error: {message}")]
    Capability {
        /// Error message
        message: String,
    },

    /// Assertion failed (page-object level checks)
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TeclearError {
    /// Build a capability error from any displayable source
    #[must_use]
    pub fn capability(message: impl std::fmt::Display) -> Self {
        Self::Capability {
            message: message.to_string(),
        }
    }

    /// Build an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }
}
