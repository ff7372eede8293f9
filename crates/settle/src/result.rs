//! Result and error types for settle.
//!
//! Timeout failures carry enough context to tell apart the three ways a wait
//! can go wrong: the element never appeared, it appeared in the wrong state,
//! or the selector itself was broken.

use std::path::PathBuf;

use thiserror::Error;

use crate::describe::ElementSnapshot;
use crate::driver::DriverError;

/// Result type for settle operations
pub type SettleResult<T> = Result<T, SettleError>;

/// Errors that can occur while waiting on or interacting with elements
#[derive(Debug, Error)]
pub enum SettleError {
    /// The driver rejected the selector syntax. Never retried.
    #[error("Invalid selector {{{selector}}}: {source}")]
    InvalidSelector {
        /// Search criteria of the element
        selector: String,
        /// Driver failure that classified the selector as malformed
        #[source]
        source: DriverError,
    },

    /// No element could be resolved within the timeout
    #[error(
        "Element not found {{{selector}}}\nExpected: {condition}\nTimeout: {timeout_ms} ms.{}",
        caused_by(.cause.as_ref())
    )]
    ElementNotFound {
        /// Search criteria of the element
        selector: String,
        /// Condition that was awaited
        condition: String,
        /// Most recent low-level failure, if any
        cause: Option<DriverError>,
        /// Timeout that was used
        timeout_ms: u64,
    },

    /// The element was resolvable but the condition never held
    #[error(
        "Element should {expectation} {{{selector}}}\nElement: '{element}'\nTimeout: {timeout_ms} ms.{}",
        caused_by(.cause.as_ref())
    )]
    ConditionUnmet {
        /// Search criteria of the element
        selector: String,
        /// What the element should have been, e.g. `be visible`
        expectation: String,
        /// Snapshot of the last resolved element
        element: ElementSnapshot,
        /// Most recent low-level failure, if any
        cause: Option<DriverError>,
        /// Timeout that was used
        timeout_ms: u64,
    },

    /// The element was resolvable but the condition never stopped holding
    #[error(
        "Element should not {expectation} {{{selector}}}\nElement: '{element}'\nTimeout: {timeout_ms} ms.{}",
        caused_by(.cause.as_ref())
    )]
    ConditionStillMet {
        /// Search criteria of the element
        selector: String,
        /// What the element should not have been, e.g. `be visible`
        expectation: String,
        /// Snapshot of the last resolved element
        element: ElementSnapshot,
        /// Most recent low-level failure, if any
        cause: Option<DriverError>,
        /// Timeout that was used
        timeout_ms: u64,
    },

    /// Caller misuse detected before any waiting took place
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// A local file to upload does not exist
    #[error("File not found: {}", path.display())]
    FileNotFound {
        /// Path as supplied by the caller
        path: PathBuf,
    },

    /// Driver failure outside the recoverable set, passed through unchanged
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Malformed configuration value
    #[error("Invalid configuration: {message}")]
    Config {
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

impl SettleError {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Whether this error was produced by an exhausted wait
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. } | Self::ConditionUnmet { .. } | Self::ConditionStillMet { .. }
        )
    }

    /// Whether this error is the fatal malformed-selector category
    #[must_use]
    pub const fn is_invalid_selector(&self) -> bool {
        matches!(self, Self::InvalidSelector { .. })
    }

    /// Most recent low-level cause recorded by a wait, or the driver error itself
    #[must_use]
    pub const fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Self::InvalidSelector { source, .. } => Some(source),
            Self::ElementNotFound { cause, .. }
            | Self::ConditionUnmet { cause, .. }
            | Self::ConditionStillMet { cause, .. } => cause.as_ref(),
            Self::Driver(err) => Some(err),
            _ => None,
        }
    }
}

fn caused_by(cause: Option<&DriverError>) -> String {
    cause.map_or_else(String::new, |err| format!("\nCaused by: {err}"))
}
