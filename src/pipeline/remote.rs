//! Remote processing call: one request in, exactly one result out.
//!
//! The call is raced against two exits:
//!
//! * a **timeout**, always set;
//! * a **cancellation token**, fired by `reset()` or by dropping the
//!   `submit()` future, so a torn-down view never receives a late result.
//!
//! No retries: a failed call resolves to [`ToolResult::Failed`] and the
//! caller decides whether to call `retry()`.

use crate::error::ToolError;
use crate::request::ToolRequest;
use crate::result::ToolResult;
use crate::tool::Tool;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Run `tool.process(request)` with a deadline and a cancellation exit.
pub async fn run<T: Tool>(
    tool: &T,
    request: &ToolRequest,
    timeout: Duration,
    cancel: &CancellationToken,
) -> ToolResult<T::Output> {
    let start = Instant::now();
    let name = tool.name();

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ToolError::Cancelled),
        res = tokio::time::timeout(timeout, tool.process(request)) => match res {
            Ok(inner) => inner,
            Err(_) => Err(ToolError::Timeout { secs: timeout.as_secs().max(1) }),
        },
    };

    let elapsed = start.elapsed();
    match outcome {
        Ok(artifact) => {
            debug!("{name}: processed in {:?}", elapsed);
            ToolResult::succeeded(artifact)
        }
        Err(error) => {
            warn!("{name}: failed after {:?}: {}", elapsed, error);
            ToolResult::failed(error)
        }
    }
}
