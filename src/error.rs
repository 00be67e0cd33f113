//! Error types for the ginywow-tools library.
//!
//! Two error types cover two distinct failure points of the pipeline:
//!
//! * [`ValidationError`]: **local**. The input violated the tool's declared
//!   constraints (wrong type, too large, blank, bad option). Raised by
//!   [`crate::pipeline::input::acquire`] before any network access; a request
//!   that fails here never reaches a backend.
//!
//! * [`ToolError`]: everything that can go wrong around a request, from the
//!   preview stage to the remote call. Stored inside
//!   [`crate::result::ToolResult::Failed`] so the caller can render it, and
//!   returned directly when the controller refuses a transition.
//!
//! Both types are `Clone` + `Serialize`: a failed result is kept in the
//! pipeline state and may be rendered (or emitted as JSON) more than once.

use serde::Serialize;
use thiserror::Error;

/// Fallback shown when the backend gave no usable message.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Input rejected before submission.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ValidationError {
    /// MIME type (sniffed, by extension, or declared) is not in the allow-list.
    #[error("Unsupported file type '{mime}'. Allowed: {}", allowed.join(", "))]
    UnsupportedType { mime: String, allowed: Vec<String> },

    /// Payload exceeds the tool's byte ceiling.
    #[error("File is too large ({}); the limit is {}", human_size(*size), human_size(*limit))]
    TooLarge { size: u64, limit: u64 },

    /// Required text was empty or whitespace only.
    #[error("Please enter {field}")]
    EmptyInput { field: String },

    /// Input had the wrong shape (file where text was expected, bad URL, bad date…).
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// An option value is unknown, out of range, or missing.
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },
}

impl ValidationError {
    /// Stable signal name, independent of the display message.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::UnsupportedType { .. } => "UnsupportedTypeError",
            ValidationError::TooLarge { .. } => "TooLargeError",
            ValidationError::EmptyInput { .. } => "EmptyInputError",
            ValidationError::InvalidInput { .. } => "InvalidInputError",
            ValidationError::InvalidParameter { .. } => "InvalidParameterError",
        }
    }

    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        ValidationError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// All errors surfaced by a tool pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolError {
    // ── Local errors ──────────────────────────────────────────────────────
    /// Input failed validation; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The input could not be rendered locally (corrupt or truncated file).
    #[error("Could not preview the file: {detail}")]
    Preview { detail: String },

    // ── Remote errors ─────────────────────────────────────────────────────
    /// The request never completed (DNS, connect, reset, body read).
    #[error("Network error: {detail}")]
    Network { detail: String },

    /// The backend answered with a failure status or a `success: false` body.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// No response within the tool's allowed wait.
    #[error("Request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The in-flight call was abandoned by a reset or pipeline teardown.
    #[error("Request was cancelled")]
    Cancelled,

    // ── State-machine errors ─────────────────────────────────────────────
    /// A call is already in flight for this pipeline.
    #[error("A request is already in progress")]
    Busy,

    /// Submit was attempted before any input was acquired.
    #[error("Nothing to submit: add a file or text first")]
    NoInput,

    /// The requested action is not allowed from the current state.
    #[error("Cannot {action} while {from}")]
    InvalidState { from: String, action: String },

    // ── Config / I/O ──────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading an input file or writing a download failed.
    #[error("I/O error on '{path}': {detail}")]
    Io { path: String, detail: String },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Taxonomy signal for the error, e.g. `"NetworkError"`.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::Validation(_) => "ValidationError",
            ToolError::Preview { .. } => "PreviewError",
            ToolError::Network { .. } => "NetworkError",
            ToolError::Server { .. } => "ServerError",
            ToolError::Timeout { .. } => "TimeoutError",
            ToolError::Cancelled => "CancelledError",
            ToolError::Busy => "BusyError",
            ToolError::NoInput => "NoInputError",
            ToolError::InvalidState { .. } => "InvalidStateError",
            ToolError::InvalidConfig(_) => "ConfigError",
            ToolError::Io { .. } => "IoError",
            ToolError::Internal(_) => "InternalError",
        }
    }

    /// Message suitable for a toast: the server's own text when it sent one,
    /// a hint for transport failures, the generic fallback otherwise.
    pub fn user_message(&self) -> String {
        match self {
            ToolError::Server { message, .. } if !message.trim().is_empty() => message.clone(),
            ToolError::Server { .. } | ToolError::Internal(_) => GENERIC_FAILURE.to_string(),
            ToolError::Network { .. } => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            ToolError::Timeout { secs } => {
                format!("The server took longer than {secs}s to respond. Please try again.")
            }
            other => other.to_string(),
        }
    }

    /// True for failures of the remote call itself (network, server, timeout).
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            ToolError::Network { .. } | ToolError::Server { .. } | ToolError::Timeout { .. }
        )
    }

    pub(crate) fn io(path: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        ToolError::Io {
            path: path.to_string(),
            detail: err.to_string(),
        }
    }
}

/// Format a byte count as `"1.5 MB"` style text.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
