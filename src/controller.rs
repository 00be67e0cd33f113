//! The reusable tool-page controller.
//!
//! [`ToolPipeline`] owns the whole per-page lifecycle: acquire → preview →
//! submit → render → reset. A tool only supplies its rules and its processing step
//! (see [`Tool`]).
//!
//! ## Concurrency
//!
//! All methods take `&self`; state sits behind a `std::sync::Mutex` that is
//! never held across an `.await`. Two tasks racing `submit()` on the same
//! pipeline therefore see one winner and one [`ToolError::Busy`]. Every
//! transition bumps a generation counter so that a call resolving after a
//! `reset()` cannot write its result into the fresh state.

use crate::config::{InputKind, PipelineConfig};
use crate::error::ToolError;
use crate::notify::{NoopNotifier, SharedNotifier};
use crate::pipeline::{input, preview::PreviewHandle, remote};
use crate::request::{Parameters, RawInput, ToolRequest};
use crate::result::{Artifact, ToolResult};
use crate::state::PipelineState;
use crate::tool::Tool;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

struct Inner<O> {
    state: PipelineState,
    request: Option<ToolRequest>,
    preview: Option<PreviewHandle>,
    result: Option<ToolResult<O>>,
    generation: u64,
    /// Generation of an `acquire` still waiting on its preview.
    acquiring: Option<u64>,
    cancel: Option<CancellationToken>,
}

impl<O> Default for Inner<O> {
    fn default() -> Self {
        Self {
            state: PipelineState::Idle,
            request: None,
            preview: None,
            result: None,
            generation: 0,
            acquiring: None,
            cancel: None,
        }
    }
}

/// State machine for one tool page instance.
///
/// # Example
/// ```rust,no_run
/// use ginywow_tools::tools::youtube::YoutubeThumbnailTool;
/// use ginywow_tools::{Parameters, PipelineConfig, RawInput, ToolPipeline};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), ginywow_tools::ToolError> {
/// let config = PipelineConfig::default();
/// let pipeline = ToolPipeline::new(YoutubeThumbnailTool::from_config(&config), config);
///
/// pipeline
///     .acquire(RawInput::text("https://youtu.be/dQw4w9WgXcQ"), Parameters::new())
///     .await?;
/// let result = pipeline.submit().await?;
/// assert!(result.is_success());
/// pipeline.reset();
/// # Ok(())
/// # }
/// ```
pub struct ToolPipeline<T: Tool> {
    tool: Arc<T>,
    config: PipelineConfig,
    notifier: SharedNotifier,
    inner: Mutex<Inner<T::Output>>,
}

impl<T: Tool> ToolPipeline<T> {
    pub fn new(tool: T, config: PipelineConfig) -> Self {
        Self {
            tool: Arc::new(tool),
            config,
            notifier: Arc::new(NoopNotifier),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Route user-facing events to `notifier`.
    pub fn with_notifier(mut self, notifier: SharedNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    pub fn state(&self) -> PipelineState {
        self.lock().state
    }

    /// The request currently held (kept after a failed submission).
    pub fn request(&self) -> Option<ToolRequest> {
        self.lock().request.clone()
    }

    pub fn preview(&self) -> Option<PreviewHandle> {
        self.lock().preview.clone()
    }

    /// The most recent resolved result, if it is still on display.
    pub fn result(&self) -> Option<ToolResult<T::Output>> {
        self.lock().result.clone()
    }

    // ── Transitions ──────────────────────────────────────────────────────

    /// Validate and preview new input. Replaces any previous input and result.
    ///
    /// A rejected input leaves the pipeline exactly as it was. Until the
    /// preview finishes, `submit()` and `retry()` return [`ToolError::Busy`].
    pub async fn acquire(
        &self,
        raw: RawInput,
        params: Parameters,
    ) -> Result<PreviewHandle, ToolError> {
        let name = self.tool.name();
        let generation = {
            let mut inner = self.lock();
            if inner.state == PipelineState::Submitting {
                return Err(ToolError::Busy);
            }
            inner.generation += 1;
            // The held request is stale from here on; submit() must wait.
            inner.acquiring = Some(inner.generation);
            inner.generation
        };
        let mut pending = Pending {
            inner: &self.inner,
            generation,
            armed: true,
        };

        let constraints = self.effective_constraints();
        let validated = input::acquire(name, raw, &params, &constraints, &self.tool.options())
            .and_then(|request| self.tool.validate(&request).map(|()| request));
        let request = match validated {
            Ok(request) => request,
            Err(err) => {
                info!("{name}: input rejected ({})", err.kind());
                self.notifier.on_validation_error(name, &err);
                return Err(err.into());
            }
        };

        let previewed = self.tool.preview(&request).await;

        let mut inner = self.lock();
        pending.armed = false;
        if inner.acquiring == Some(generation) {
            inner.acquiring = None;
        }
        if inner.generation != generation {
            debug!("{name}: acquisition superseded");
            return Err(ToolError::Cancelled);
        }
        match previewed {
            Ok(preview) => {
                inner.state = PipelineState::Previewing;
                inner.request = Some(request);
                inner.preview = Some(preview.clone());
                inner.result = None;
                drop(inner);
                info!("{name}: input accepted");
                self.notifier.on_acquired(name, &preview);
                Ok(preview)
            }
            Err(err) => {
                inner.state = PipelineState::Failed;
                inner.request = None;
                inner.preview = None;
                inner.result = Some(ToolResult::failed(err.clone()));
                drop(inner);
                info!("{name}: preview failed: {err}");
                self.notifier.on_failure(name, &err.user_message());
                Err(err)
            }
        }
    }

    /// Send the held request. Only allowed from `Previewing`.
    pub async fn submit(&self) -> Result<ToolResult<T::Output>, ToolError> {
        let name = self.tool.name();
        let (request, generation, token) = {
            let mut inner = self.lock();
            match inner.state {
                _ if inner.acquiring.is_some() => return Err(ToolError::Busy),
                PipelineState::Previewing => {}
                PipelineState::Submitting => return Err(ToolError::Busy),
                PipelineState::Idle => return Err(ToolError::NoInput),
                from => {
                    return Err(ToolError::InvalidState {
                        from: from.to_string(),
                        action: "submit".into(),
                    })
                }
            }
            let request = inner.request.clone().ok_or(ToolError::NoInput)?;
            let token = CancellationToken::new();
            inner.state = PipelineState::Submitting;
            inner.generation += 1;
            inner.cancel = Some(token.clone());
            (request, inner.generation, token)
        };

        let mut guard = InFlight {
            inner: &self.inner,
            generation,
            armed: true,
        };

        info!("{name}: submitting");
        self.notifier.on_submit_start(name);

        let result = remote::run(self.tool.as_ref(), &request, self.timeout(), &token).await;

        let mut inner = self.lock();
        guard.armed = false;
        if inner.generation != generation {
            debug!("{name}: result discarded after reset");
            return Err(ToolError::Cancelled);
        }
        inner.cancel = None;
        inner.state = if result.is_success() {
            PipelineState::Succeeded
        } else {
            PipelineState::Failed
        };
        inner.result = Some(result.clone());
        drop(inner);

        match &result {
            ToolResult::Succeeded { artifact, .. } => {
                let headline = artifact.summary().into_iter().next().unwrap_or_default();
                self.notifier.on_success(name, &headline);
            }
            ToolResult::Failed { error } => {
                self.notifier.on_failure(name, &error.user_message());
            }
        }
        Ok(result)
    }

    /// Resubmit the retained input after a failure.
    pub async fn retry(&self) -> Result<ToolResult<T::Output>, ToolError> {
        {
            let mut inner = self.lock();
            if inner.acquiring.is_some() {
                return Err(ToolError::Busy);
            }
            if inner.state != PipelineState::Failed {
                return Err(ToolError::InvalidState {
                    from: inner.state.to_string(),
                    action: "retry".into(),
                });
            }
            if inner.request.is_none() {
                return Err(ToolError::NoInput);
            }
            inner.state = PipelineState::Previewing;
            inner.result = None;
        }
        self.submit().await
    }

    /// Acquire then submit in one step.
    pub async fn run(
        &self,
        raw: RawInput,
        params: Parameters,
    ) -> Result<ToolResult<T::Output>, ToolError> {
        self.acquire(raw, params).await?;
        self.submit().await
    }

    /// Discard everything and return to `Idle`. Cancels an in-flight call.
    pub fn reset(&self) {
        let was_idle = {
            let mut inner = self.lock();
            if let Some(token) = inner.cancel.take() {
                token.cancel();
            }
            let was_idle = inner.state == PipelineState::Idle
                && inner.request.is_none()
                && inner.result.is_none();
            let generation = inner.generation + 1;
            *inner = Inner {
                generation,
                ..Inner::default()
            };
            was_idle
        };
        if !was_idle {
            info!("{}: reset", self.tool.name());
            self.notifier.on_reset(self.tool.name());
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, Inner<T::Output>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn timeout(&self) -> Duration {
        self.tool
            .timeout()
            .unwrap_or_else(|| Duration::from_secs(self.config.request_timeout_secs))
    }

    fn effective_constraints(&self) -> crate::config::Constraints {
        let mut constraints = self.tool.constraints();
        if constraints.input == InputKind::File {
            if let Some(limit) = self.config.max_upload_bytes_override {
                constraints.max_bytes = Some(limit);
            }
        }
        constraints
    }
}

/// Clears the pending-acquisition mark when an `acquire()` returns early
/// (rejected input) or its future is dropped mid-preview.
struct Pending<'a, O> {
    inner: &'a Mutex<Inner<O>>,
    generation: u64,
    armed: bool,
}

impl<O> Drop for Pending<'_, O> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        if inner.acquiring == Some(self.generation) {
            inner.acquiring = None;
        }
    }
}

/// Cancels the token and returns the pipeline to `Previewing` if a `submit()`
/// future is dropped mid-flight (teardown of the caller), so the instance is
/// not stuck in `Submitting`.
struct InFlight<'a, O> {
    inner: &'a Mutex<Inner<O>>,
    generation: u64,
    armed: bool,
}

impl<O> Drop for InFlight<'_, O> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        if inner.generation == self.generation && inner.state == PipelineState::Submitting {
            if let Some(token) = inner.cancel.take() {
                token.cancel();
            }
            inner.state = PipelineState::Previewing;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Constraints;
    use crate::notify::{Event, RecordingNotifier};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct Upper(String);

    impl Artifact for Upper {
        fn summary(&self) -> Vec<String> {
            vec![self.0.clone()]
        }
    }

    /// Uppercases text. "fail" errors, "slow" never finishes processing and
    /// "lazy" takes five seconds to preview.
    struct Shout {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for Shout {
        type Output = Upper;

        fn name(&self) -> &'static str {
            "shout"
        }

        fn constraints(&self) -> Constraints {
            Constraints::text("some text", 32)
        }

        async fn preview(&self, request: &ToolRequest) -> Result<PreviewHandle, ToolError> {
            if request.payload.as_text() == Some("lazy") {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            crate::pipeline::preview::preview(request).await
        }

        async fn process(&self, request: &ToolRequest) -> Result<Upper, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let text = request.payload.as_text().unwrap_or_default();
            match text {
                "fail" => Err(ToolError::Server {
                    status: 500,
                    message: "nope".into(),
                }),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Upper("SLOW".into()))
                }
                t => Ok(Upper(t.to_uppercase())),
            }
        }
    }

    fn pipeline() -> (ToolPipeline<Shout>, Arc<AtomicUsize>, Arc<RecordingNotifier>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let notifier = RecordingNotifier::new();
        let p = ToolPipeline::new(
            Shout {
                calls: Arc::clone(&calls),
            },
            PipelineConfig::default(),
        )
        .with_notifier(notifier.clone());
        (p, calls, notifier)
    }

    #[tokio::test]
    async fn happy_path_transitions() {
        let (p, calls, notifier) = pipeline();
        assert_eq!(p.state(), PipelineState::Idle);

        p.acquire(RawInput::text("hello"), Parameters::new()).await.unwrap();
        assert_eq!(p.state(), PipelineState::Previewing);

        let r = p.submit().await.unwrap();
        assert_eq!(r.artifact(), Some(&Upper("HELLO".into())));
        assert_eq!(p.state(), PipelineState::Succeeded);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.resolutions(), 1);
    }

    #[tokio::test]
    async fn submit_from_idle_is_no_input() {
        let (p, calls, _) = pipeline();
        assert_eq!(p.submit().await.unwrap_err(), ToolError::NoInput);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn resubmit_after_success_needs_new_input() {
        let (p, calls, _) = pipeline();
        p.run(RawInput::text("a"), Parameters::new()).await.unwrap();
        let err = p.submit().await.unwrap_err();
        assert_eq!(err.kind(), "InvalidStateError");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_keeps_input_and_retry_resubmits() {
        let (p, calls, notifier) = pipeline();
        let r = p.run(RawInput::text("fail"), Parameters::new()).await.unwrap();
        assert!(!r.is_success());
        assert_eq!(p.state(), PipelineState::Failed);
        assert!(p.request().is_some());
        assert!(p.preview().is_some());

        let again = p.retry().await.unwrap();
        assert!(!again.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(notifier.resolutions(), 2);
    }

    #[tokio::test]
    async fn validation_error_leaves_state_untouched() {
        let (p, _, notifier) = pipeline();
        p.acquire(RawInput::text("ok"), Parameters::new()).await.unwrap();
        let err = p
            .acquire(RawInput::text("x".repeat(64)), Parameters::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
        assert_eq!(p.state(), PipelineState::Previewing);
        assert_eq!(
            p.request().unwrap().payload.as_text(),
            Some("ok")
        );
        assert!(notifier.events().iter().any(|e| matches!(
            e,
            Event::ValidationError { kind, .. } if kind == "TooLargeError"
        )));
    }

    #[tokio::test]
    async fn reset_is_idempotent() {
        let (p, _, notifier) = pipeline();
        p.reset();
        p.reset();
        assert_eq!(p.state(), PipelineState::Idle);
        assert!(notifier.events().is_empty());

        p.run(RawInput::text("x"), Parameters::new()).await.unwrap();
        p.reset();
        p.reset();
        assert_eq!(p.state(), PipelineState::Idle);
        assert!(p.result().is_none());
        assert!(p.preview().is_none());
        assert!(p.request().is_none());
        let resets = notifier
            .events()
            .iter()
            .filter(|e| matches!(e, Event::Reset { .. }))
            .count();
        assert_eq!(resets, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_submit_is_busy() {
        let (p, calls, _) = pipeline();
        let p = Arc::new(p);
        p.acquire(RawInput::text("slow"), Parameters::new()).await.unwrap();

        let first = tokio::spawn({
            let p = Arc::clone(&p);
            async move { p.submit().await }
        });
        // Let the first submit reach its suspension point.
        tokio::task::yield_now().await;
        while p.state() != PipelineState::Submitting {
            tokio::task::yield_now().await;
        }

        assert_eq!(p.submit().await.unwrap_err(), ToolError::Busy);
        assert_eq!(
            p.acquire(RawInput::text("other"), Parameters::new())
                .await
                .unwrap_err(),
            ToolError::Busy
        );

        p.reset();
        assert_eq!(first.await.unwrap().unwrap_err(), ToolError::Cancelled);
        assert_eq!(p.state(), PipelineState::Idle);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropped_submit_returns_to_previewing() {
        let (p, _, _) = pipeline();
        p.acquire(RawInput::text("slow"), Parameters::new()).await.unwrap();
        let fut = p.submit();
        let _ = tokio::time::timeout(Duration::from_millis(10), fut).await;
        assert_eq!(p.state(), PipelineState::Previewing);
        assert!(p.request().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn submit_waits_for_a_pending_acquire() {
        let (p, calls, _) = pipeline();
        let p = Arc::new(p);
        p.acquire(RawInput::text("a"), Parameters::new()).await.unwrap();

        let newer = tokio::spawn({
            let p = Arc::clone(&p);
            async move { p.acquire(RawInput::text("lazy"), Parameters::new()).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(p.submit().await.unwrap_err(), ToolError::Busy);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        newer.await.unwrap().unwrap();
        assert_eq!(p.request().unwrap().payload.as_text(), Some("lazy"));
        let r = p.submit().await.unwrap();
        assert_eq!(r.artifact(), Some(&Upper("LAZY".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_acquire_releases_submit() {
        let (p, _, _) = pipeline();
        p.acquire(RawInput::text("a"), Parameters::new()).await.unwrap();

        let abandoned = tokio::time::timeout(
            Duration::from_secs(1),
            p.acquire(RawInput::text("lazy"), Parameters::new()),
        )
        .await;
        assert!(abandoned.is_err());

        let r = p.submit().await.unwrap();
        assert_eq!(r.artifact(), Some(&Upper("A".into())));
    }
}
