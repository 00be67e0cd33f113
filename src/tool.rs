//! The [`Tool`] trait: what a single utility page contributes.
//!
//! A tool is a thin configuration object. It declares its input rules and
//! options, and implements the one remote (or local) processing step. All
//! state handling (validation order, preview, in-flight bookkeeping,
//! timeouts, notifications, reset) belongs to
//! [`crate::controller::ToolPipeline`] and is shared by every tool.

use crate::config::{Constraints, OptionSpec};
use crate::error::{ToolError, ValidationError};
use crate::pipeline::preview::{self, PreviewHandle};
use crate::request::ToolRequest;
use crate::result::Artifact;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait Tool: Send + Sync {
    /// The artifact a successful run produces.
    type Output: Artifact + Clone + Send + Sync + 'static;

    /// Stable identifier, used in logs and notifications (`"convert-image"`).
    fn name(&self) -> &'static str;

    /// Input rules checked before anything is sent.
    fn constraints(&self) -> Constraints;

    /// Options the tool accepts. Unknown names are rejected.
    fn options(&self) -> Vec<OptionSpec> {
        Vec::new()
    }

    /// Per-tool override of the pipeline's request timeout.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Tool-specific checks run after the generic ones, before preview.
    fn validate(&self, _request: &ToolRequest) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Local preview of a validated request.
    async fn preview(&self, request: &ToolRequest) -> Result<PreviewHandle, ToolError> {
        preview::preview(request).await
    }

    /// Run the processing step for one validated request.
    async fn process(&self, request: &ToolRequest) -> Result<Self::Output, ToolError>;
}
