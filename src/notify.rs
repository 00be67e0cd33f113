//! Notification trait: the pipeline's toast channel.
//!
//! Inject an [`Arc<dyn Notifier>`] via
//! [`crate::controller::ToolPipeline::with_notifier`] to receive user-facing
//! events as a pipeline moves through its states.
//!
//! # Guarantees
//!
//! * Every resolved remote call emits exactly one of
//!   [`Notifier::on_success`] / [`Notifier::on_failure`].
//! * A rejected input emits [`Notifier::on_validation_error`] and nothing else.
//! * A call discarded by `reset()` emits nothing on resolution; the reset
//!   itself is reported through [`Notifier::on_reset`].
//!
//! # Example
//!
//! ```rust
//! use ginywow_tools::Notifier;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct FailureCounter(AtomicUsize);
//!
//! impl Notifier for FailureCounter {
//!     fn on_failure(&self, _tool: &str, message: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("✗ {message}");
//!     }
//! }
//! ```

use crate::error::ValidationError;
use crate::pipeline::preview::PreviewHandle;
use std::sync::{Arc, Mutex};

/// Receives pipeline events. All methods default to no-ops.
///
/// Implementations must be `Send + Sync`: a pipeline may be driven from any
/// Tokio worker thread.
pub trait Notifier: Send + Sync {
    /// Input was accepted and previewed.
    fn on_acquired(&self, tool: &str, preview: &PreviewHandle) {
        let _ = (tool, preview);
    }

    /// Input was rejected before submission.
    fn on_validation_error(&self, tool: &str, error: &ValidationError) {
        let _ = (tool, error);
    }

    /// The remote call is about to start.
    fn on_submit_start(&self, tool: &str) {
        let _ = tool;
    }

    /// The remote call resolved successfully.
    ///
    /// `summary` is the first line of the artifact's summary.
    fn on_success(&self, tool: &str, summary: &str) {
        let _ = (tool, summary);
    }

    /// The remote call (or the preview step) failed.
    ///
    /// `message` is [`crate::ToolError::user_message`], ready for display.
    fn on_failure(&self, tool: &str, message: &str) {
        let _ = (tool, message);
    }

    /// The pipeline was reset to `Idle`.
    fn on_reset(&self, tool: &str) {
        let _ = tool;
    }
}

/// A no-op implementation for callers that don't need notifications.
///
/// This is the default when no notifier is configured.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {}

/// Convenience alias for the shared notifier handle.
pub type SharedNotifier = Arc<dyn Notifier>;

/// One recorded notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Acquired { tool: String },
    ValidationError { tool: String, kind: String },
    SubmitStart { tool: String },
    Success { tool: String, summary: String },
    Failure { tool: String, message: String },
    Reset { tool: String },
}

/// Stores every event in order. Handy for asserting on notification counts.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Event>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of every event so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Count of success + failure notifications.
    pub fn resolutions(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Success { .. } | Event::Failure { .. }))
            .count()
    }

    fn push(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl Notifier for RecordingNotifier {
    fn on_acquired(&self, tool: &str, _preview: &PreviewHandle) {
        self.push(Event::Acquired { tool: tool.into() });
    }

    fn on_validation_error(&self, tool: &str, error: &ValidationError) {
        self.push(Event::ValidationError {
            tool: tool.into(),
            kind: error.kind().into(),
        });
    }

    fn on_submit_start(&self, tool: &str) {
        self.push(Event::SubmitStart { tool: tool.into() });
    }

    fn on_success(&self, tool: &str, summary: &str) {
        self.push(Event::Success {
            tool: tool.into(),
            summary: summary.into(),
        });
    }

    fn on_failure(&self, tool: &str, message: &str) {
        self.push(Event::Failure {
            tool: tool.into(),
            message: message.into(),
        });
    }

    fn on_reset(&self, tool: &str) {
        self.push(Event::Reset { tool: tool.into() });
    }
}
