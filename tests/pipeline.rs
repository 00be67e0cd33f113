//! Integration tests for the tool pipeline.
//!
//! Remote tools run against a local mockito server; the timing tests use a
//! slow in-process tool under Tokio's paused clock, so nothing here needs
//! network access.

use async_trait::async_trait;
use ginywow_tools::tools::age::AgeCalculatorTool;
use ginywow_tools::tools::image::{BackgroundRemovalTool, ImageConvertTool};
use ginywow_tools::tools::qr::QrTool;
use ginywow_tools::tools::youtube::{ThumbnailVariant, YoutubeThumbnailTool};
use ginywow_tools::{
    download, render, Artifact, BackendClient, Constraints, Event, Parameters, PipelineConfig,
    PipelineState, RawInput, RecordingNotifier, Tool, ToolError, ToolPipeline, ToolRequest,
    ValidationError,
};
use mockito::Matcher;
use std::sync::Arc;
use std::time::Duration;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn config(base: &str) -> PipelineConfig {
    PipelineConfig::builder().api_base_url(base).build().unwrap()
}

fn client(config: &PipelineConfig) -> BackendClient {
    BackendClient::new(config).unwrap()
}

#[derive(Debug, Clone)]
struct Echo(String);

impl Artifact for Echo {
    fn summary(&self) -> Vec<String> {
        vec![self.0.clone()]
    }
}

/// Uppercases its input after `delay`.
struct SlowTool {
    delay: Duration,
    timeout: Option<Duration>,
}

impl SlowTool {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            timeout: None,
        }
    }
}

#[async_trait]
impl Tool for SlowTool {
    type Output = Echo;

    fn name(&self) -> &'static str {
        "slow-upper"
    }

    fn constraints(&self) -> Constraints {
        Constraints::text("some text", 1024)
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn process(&self, request: &ToolRequest) -> Result<Echo, ToolError> {
        tokio::time::sleep(self.delay).await;
        Ok(Echo(
            request.payload.as_text().unwrap_or_default().to_uppercase(),
        ))
    }
}

fn slow_pipeline(tool: SlowTool) -> (Arc<ToolPipeline<SlowTool>>, Arc<RecordingNotifier>) {
    let events = RecordingNotifier::new();
    let pipeline =
        ToolPipeline::new(tool, PipelineConfig::default()).with_notifier(events.clone());
    (Arc::new(pipeline), events)
}

// ── Image tools ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn oversized_upload_is_rejected_without_a_request() {
    let mut server = mockito::Server::new_async().await;
    let m = server
        .mock("POST", "/api/convert-image")
        .expect(0)
        .create_async()
        .await;

    let cfg = config(&server.url());
    let events = RecordingNotifier::new();
    let pipeline = ToolPipeline::new(ImageConvertTool::new(client(&cfg)), cfg)
        .with_notifier(events.clone());

    let mut bytes = png(4, 3);
    bytes.resize(15 * 1024 * 1024, 0);
    let err = pipeline
        .acquire(
            RawInput::dropped("huge.png", bytes),
            Parameters::new().with("format", "webp"),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ToolError::Validation(ValidationError::TooLarge { .. })
    ));
    assert_eq!(pipeline.state(), PipelineState::Idle);
    assert!(pipeline.request().is_none());
    assert_eq!(pipeline.submit().await.unwrap_err().kind(), "NoInputError");
    assert_eq!(
        events.events(),
        vec![Event::ValidationError {
            tool: "convert-image".into(),
            kind: "TooLargeError".into(),
        }]
    );
    m.assert_async().await;
}

#[tokio::test]
async fn convert_to_webp_posts_once_and_saves_the_image() {
    let mut server = mockito::Server::new_async().await;
    let webp = b"RIFF\x1a\x00\x00\x00WEBPVP8 ";
    let body = serde_json::json!({
        "success": true,
        "processedImage": format!(
            "data:image/webp;base64,{}",
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, webp)
        ),
    });
    let m = server
        .mock("POST", "/api/convert-image")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="image"; filename="holiday.png""#.into()),
            Matcher::Regex("name=\"format\"\r\n\r\nwebp\r\n".into()),
            Matcher::Regex("name=\"quality\"\r\n\r\n85\r\n".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .expect(1)
        .create_async()
        .await;

    let cfg = config(&server.url());
    let http = client(&cfg);
    let events = RecordingNotifier::new();
    let pipeline =
        ToolPipeline::new(ImageConvertTool::new(http.clone()), cfg).with_notifier(events.clone());

    let result = pipeline
        .run(
            RawInput::picked("holiday.png", png(8, 6)),
            Parameters::new().with("format", "webp").with("quality", "85"),
        )
        .await
        .unwrap();
    m.assert_async().await;

    assert!(result.is_success());
    let image = result.artifact().unwrap();
    assert_eq!(image.mime, "image/webp");
    assert_eq!(&image.bytes[..], &webp[..]);
    assert_eq!(pipeline.state(), PipelineState::Succeeded);
    assert_eq!(events.resolutions(), 1);

    let view = render(&result);
    assert!(view.success);
    assert_eq!(view.downloads.len(), 1);

    let dir = tempfile::tempdir().unwrap();
    let saved = download(&view.downloads[0], dir.path(), &http).await.unwrap();
    assert_eq!(saved.file_name().unwrap(), "holiday.webp");
    assert_eq!(std::fs::read(&saved).unwrap(), webp.to_vec());
}

#[tokio::test]
async fn background_removal_failure_keeps_the_upload_for_retry() {
    let mut server = mockito::Server::new_async().await;
    let failing = server
        .mock("POST", "/api/remove-background")
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success":false,"error":"Background removal failed"}"#)
        .expect(1)
        .create_async()
        .await;

    let cfg = config(&server.url());
    let events = RecordingNotifier::new();
    let pipeline = ToolPipeline::new(BackgroundRemovalTool::new(client(&cfg)), cfg)
        .with_notifier(events.clone());

    let result = pipeline
        .run(RawInput::dropped("portrait.png", png(6, 6)), Parameters::new())
        .await
        .unwrap();
    failing.assert_async().await;
    failing.remove_async().await;

    assert!(!result.is_success());
    assert_eq!(result.error().unwrap().kind(), "ServerError");
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(pipeline.preview().is_some());
    let kept = pipeline.request().unwrap();
    assert_eq!(kept.payload.as_file().unwrap().name, "portrait.png");

    let failures: Vec<_> = events
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::Failure { .. }))
        .collect();
    assert_eq!(failures.len(), 1);

    let view = render(&result);
    assert!(!view.success);
    assert_eq!(view.error_kind.as_deref(), Some("ServerError"));

    // The backend recovers; retry reuses the retained upload.
    let cut_out = png(6, 6);
    let body = serde_json::json!({
        "success": true,
        "processedImage": format!(
            "data:image/png;base64,{}",
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &cut_out)
        ),
    });
    let ok = server
        .mock("POST", "/api/remove-background")
        .with_status(200)
        .with_body(body.to_string())
        .expect(1)
        .create_async()
        .await;

    let retried = pipeline.retry().await.unwrap();
    ok.assert_async().await;
    assert!(retried.is_success());
    assert_eq!(retried.download_name(), Some("portrait-no-bg.png"));
    assert_eq!(pipeline.state(), PipelineState::Succeeded);
    assert_eq!(events.resolutions(), 2);
}

#[tokio::test]
async fn unreachable_backend_is_a_network_failure() {
    // Port 9 (discard) on localhost is not expected to be listening.
    let cfg = config("http://127.0.0.1:9");
    let pipeline = ToolPipeline::new(BackgroundRemovalTool::new(client(&cfg)), cfg);

    let result = pipeline
        .run(RawInput::dropped("a.png", png(2, 2)), Parameters::new())
        .await
        .unwrap();
    assert_eq!(result.error().unwrap().kind(), "NetworkError");
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(pipeline.request().is_some());
}

// ── State machine ────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn second_submit_while_in_flight_is_busy() {
    let (pipeline, events) = slow_pipeline(SlowTool::new(Duration::from_secs(5)));
    pipeline
        .acquire(RawInput::text("hello"), Parameters::new())
        .await
        .unwrap();

    let first = tokio::spawn({
        let p = pipeline.clone();
        async move { p.submit().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(pipeline.state(), PipelineState::Submitting);
    assert!(matches!(pipeline.submit().await, Err(ToolError::Busy)));
    assert!(matches!(
        pipeline
            .acquire(RawInput::text("other"), Parameters::new())
            .await,
        Err(ToolError::Busy)
    ));

    let result = first.await.unwrap().unwrap();
    assert_eq!(result.artifact().unwrap().0, "HELLO");
    assert_eq!(events.resolutions(), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_call_times_out_and_keeps_input() {
    let (pipeline, events) = slow_pipeline(SlowTool {
        delay: Duration::from_secs(30),
        timeout: Some(Duration::from_secs(2)),
    });

    let result = pipeline
        .run(RawInput::text("hello"), Parameters::new())
        .await
        .unwrap();

    assert!(matches!(
        result.error(),
        Some(ToolError::Timeout { secs: 2 })
    ));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(pipeline.request().is_some());
    assert!(events.events().iter().any(|e| matches!(
        e,
        Event::Failure { message, .. } if message.contains("2s")
    )));
}

#[tokio::test(start_paused = true)]
async fn reset_cancels_the_in_flight_call() {
    let (pipeline, events) = slow_pipeline(SlowTool::new(Duration::from_secs(5)));
    pipeline
        .acquire(RawInput::text("hello"), Parameters::new())
        .await
        .unwrap();

    let pending = tokio::spawn({
        let p = pipeline.clone();
        async move { p.submit().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    pipeline.reset();

    assert!(matches!(
        pending.await.unwrap(),
        Err(ToolError::Cancelled)
    ));
    assert_eq!(pipeline.state(), PipelineState::Idle);
    assert!(pipeline.result().is_none());
    assert_eq!(events.resolutions(), 0);
    assert!(events.events().contains(&Event::Reset {
        tool: "slow-upper".into()
    }));
}

#[tokio::test(start_paused = true)]
async fn reset_returns_to_idle_from_every_state() {
    let (pipeline, events) = slow_pipeline(SlowTool::new(Duration::from_millis(100)));

    fn assert_clean(p: &ToolPipeline<SlowTool>) {
        assert_eq!(p.state(), PipelineState::Idle);
        assert!(p.request().is_none());
        assert!(p.preview().is_none());
        assert!(p.result().is_none());
    }

    // Idle: nothing to report.
    pipeline.reset();
    assert_clean(&pipeline);
    assert!(events.events().is_empty());

    // Previewing.
    pipeline
        .acquire(RawInput::text("a"), Parameters::new())
        .await
        .unwrap();
    pipeline.reset();
    assert_clean(&pipeline);

    // Succeeded.
    pipeline
        .run(RawInput::text("b"), Parameters::new())
        .await
        .unwrap();
    assert_eq!(pipeline.state(), PipelineState::Succeeded);
    pipeline.reset();
    assert_clean(&pipeline);

    // Failed (validation leaves Idle, so fail through a timeout instead).
    let (failing, _) = slow_pipeline(SlowTool {
        delay: Duration::from_secs(10),
        timeout: Some(Duration::from_secs(1)),
    });
    failing
        .run(RawInput::text("c"), Parameters::new())
        .await
        .unwrap();
    assert_eq!(failing.state(), PipelineState::Failed);
    failing.reset();
    assert_clean(&failing);

    let resets = events
        .events()
        .iter()
        .filter(|e| matches!(e, Event::Reset { .. }))
        .count();
    assert_eq!(resets, 2);

    // Usable again after a reset.
    let again = pipeline
        .run(RawInput::text("d"), Parameters::new())
        .await
        .unwrap();
    assert_eq!(again.artifact().unwrap().0, "D");
}

// ── Local tools ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn youtube_url_yields_four_thumbnail_urls() {
    let pipeline = ToolPipeline::new(
        YoutubeThumbnailTool::from_config(&PipelineConfig::default()),
        PipelineConfig::default(),
    );
    let result = pipeline
        .run(
            RawInput::text("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Parameters::new(),
        )
        .await
        .unwrap();

    let set = result.artifact().unwrap();
    assert_eq!(set.video_id, "dQw4w9WgXcQ");
    let urls: Vec<&str> = set.thumbnails.iter().map(|t| t.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://img.youtube.com/vi/dQw4w9WgXcQ/maxresdefault.jpg",
            "https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg",
            "https://img.youtube.com/vi/dQw4w9WgXcQ/mqdefault.jpg",
            "https://img.youtube.com/vi/dQw4w9WgXcQ/default.jpg",
        ]
    );
    assert_eq!(set.thumbnails[0].variant, ThumbnailVariant::MaxResDefault);
    assert_eq!(render(&result).downloads.len(), 4);
}

#[tokio::test]
async fn age_is_exact_calendar_arithmetic() {
    let pipeline = ToolPipeline::new(AgeCalculatorTool, PipelineConfig::default());
    let result = pipeline
        .run(
            RawInput::text("2000-01-01"),
            Parameters::new().with("today", "2025-06-15"),
        )
        .await
        .unwrap();

    let age = result.artifact().unwrap();
    assert_eq!((age.years, age.months, age.days), (25, 5, 14));
}

#[tokio::test]
async fn offline_qr_code_decodes_back_to_its_data() {
    let data = "https://ginywow.com/tools/qr-code-generator";
    let pipeline = ToolPipeline::new(QrTool::offline(), PipelineConfig::default());
    let result = pipeline
        .run(RawInput::text(data), Parameters::new().with("size", "300"))
        .await
        .unwrap();

    let qr = result.artifact().unwrap();
    assert_eq!(qr.data, data);
    let img = image::load_from_memory(&qr.png).unwrap().to_luma8();
    assert!(img.width() >= 300);

    let mut prepared = rqrr::PreparedImage::prepare(img);
    let grids = prepared.detect_grids();
    assert_eq!(grids.len(), 1);
    let (_, content) = grids[0].decode().unwrap();
    assert_eq!(content, data);
}

#[tokio::test]
async fn qr_server_provider_is_called_with_size_and_data() {
    let mut server = mockito::Server::new_async().await;
    let m = server
        .mock("GET", "/v1/create-qr-code/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("size".into(), "250x250".into()),
            Matcher::UrlEncoded("data".into(), "hello world".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(png(250, 250))
        .expect(1)
        .create_async()
        .await;

    let cfg = PipelineConfig::builder()
        .qr_api_base(server.url())
        .build()
        .unwrap();
    let pipeline = ToolPipeline::new(QrTool::online(&cfg, client(&cfg)), cfg);
    let result = pipeline
        .run(RawInput::text("hello world"), Parameters::new().with("size", "250"))
        .await
        .unwrap();
    m.assert_async().await;

    let qr = result.artifact().unwrap();
    assert_eq!(qr.size, 250);
    assert!(qr.source_url.as_deref().unwrap().contains("size=250x250"));
}
