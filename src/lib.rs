//! # ginywow-tools
//!
//! The request/response pipeline behind the GinyWow single-purpose utility
//! tools: image conversion, background removal, PDF operations, QR codes,
//! YouTube thumbnails, title optimisation and a handful of local calculators.
//!
//! ## Pipeline Overview
//!
//! Every tool runs through the same generic state machine,
//! [`ToolPipeline<T>`]:
//!
//! ```text
//! raw input
//!  │
//!  ├─ 1. Acquire  drag-drop / picker / path / text → validated ToolRequest
//!  │              (type, size, emptiness, options; no network)
//!  ├─ 2. Preview  local rendering of the input (images decoded off-thread)
//!  ├─ 3. Submit   one remote call, raced against a timeout and reset()
//!  ├─ 4. Render   ToolResult<T> → headline, lines, downloads
//!  └─ 5. Reset    back to Idle, in-flight call cancelled
//! ```
//!
//! A tool contributes only its rules and its processing step by implementing
//! [`Tool`]; it never touches pipeline state.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ginywow_tools::tools::image::ImageConvertTool;
//! use ginywow_tools::{BackendClient, Parameters, PipelineConfig, RawInput, ToolPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .api_base_url("https://ginywow.com")
//!         .build()?;
//!     let client = BackendClient::new(&config)?;
//!     let pipeline = ToolPipeline::new(ImageConvertTool::new(client.clone()), config);
//!
//!     let input = RawInput::from_path("holiday.png").await?;
//!     pipeline
//!         .acquire(input, Parameters::new().with("format", "webp").with("quality", "85"))
//!         .await?;
//!     let result = pipeline.submit().await?;
//!
//!     for item in ginywow_tools::render(&result).downloads {
//!         ginywow_tools::download(&item, "out", &client).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ginywow` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! ginywow-tools = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod mail;
pub mod notify;
pub mod pipeline;
pub mod request;
pub mod result;
pub mod state;
pub mod tool;
pub mod tools;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::BackendClient;
pub use config::{Constraints, InputKind, OptionKind, OptionSpec, PipelineConfig, PipelineConfigBuilder};
pub use controller::ToolPipeline;
pub use error::{ToolError, ValidationError};
pub use mail::{MailConfig, Mailer};
pub use notify::{Event, NoopNotifier, Notifier, RecordingNotifier, SharedNotifier};
pub use pipeline::preview::PreviewHandle;
pub use pipeline::render::{download, render, RenderedView};
pub use request::{FilePayload, InputSource, Parameters, Payload, RawInput, ToolRequest};
pub use result::{Artifact, Download, DownloadContent, ToolResult};
pub use state::PipelineState;
pub use tool::Tool;
pub use tools::{catalog, ToolInfo};
