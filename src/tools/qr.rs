//! QR code generation.
//!
//! Rendering is delegated to a [`QrProvider`]. [`QrServerProvider`] calls
//! the public `create-qr-code` API; [`LocalQrProvider`] encodes offline with
//! the `qrcode` crate and needs no network at all.

use crate::client::BackendClient;
use crate::config::{Constraints, OptionSpec, PipelineConfig};
use crate::error::{ToolError, ValidationError};
use crate::request::ToolRequest;
use crate::result::{Artifact, Download};
use crate::tool::Tool;
use async_trait::async_trait;
use bytes::Bytes;
use image::{GrayImage, ImageFormat, Luma};
use qrcode::{Color, QrCode};
use reqwest::Url;
use serde::Serialize;
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

pub const NAME: &str = "qr-code";

/// Longest payload accepted, in bytes.
pub const MAX_QR_BYTES: u64 = 2048;

pub const DOWNLOAD_NAME: &str = "qr-code.png";

/// Quiet-zone width around the symbol, in modules.
const QUIET_ZONE: usize = 4;

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

/// A rendered QR code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrImage {
    pub png: Bytes,
    /// Where the image came from, when a remote provider made it.
    pub source_url: Option<String>,
}

/// Something that can turn text into a QR code PNG.
#[async_trait]
pub trait QrProvider: Send + Sync {
    async fn generate(&self, data: &str, size: u32) -> Result<QrImage, ToolError>;
}

// ── Remote provider ──────────────────────────────────────────────────────

/// `GET {base}/v1/create-qr-code/?size=WxH&data=…`
#[derive(Debug, Clone)]
pub struct QrServerProvider {
    client: BackendClient,
    base: String,
}

impl QrServerProvider {
    pub fn new(client: BackendClient, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    /// The image URL for `data` at `size`×`size` pixels.
    pub fn url(&self, data: &str, size: u32) -> Result<Url, ToolError> {
        let mut url = Url::parse(&format!("{}/v1/create-qr-code/", self.base))
            .map_err(|e| ToolError::InvalidConfig(format!("QR API base '{}': {e}", self.base)))?;
        url.query_pairs_mut()
            .append_pair("size", &format!("{size}x{size}"))
            .append_pair("data", data);
        Ok(url)
    }
}

#[async_trait]
impl QrProvider for QrServerProvider {
    async fn generate(&self, data: &str, size: u32) -> Result<QrImage, ToolError> {
        let url = self.url(data, size)?;
        let (content_type, png) = self.client.get_bytes(url.as_str()).await?;
        if !png.starts_with(PNG_MAGIC) {
            return Err(ToolError::Server {
                status: 200,
                message: format!(
                    "QR service returned {} instead of a PNG",
                    content_type.as_deref().unwrap_or("unknown content")
                ),
            });
        }
        Ok(QrImage {
            png,
            source_url: Some(url.to_string()),
        })
    }
}

// ── Offline provider ─────────────────────────────────────────────────────

/// Encodes locally; black modules on white with a 4-module quiet zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalQrProvider;

#[async_trait]
impl QrProvider for LocalQrProvider {
    async fn generate(&self, data: &str, size: u32) -> Result<QrImage, ToolError> {
        let data = data.to_string();
        let png = tokio::task::spawn_blocking(move || render_png(&data, size))
            .await
            .map_err(|e| ToolError::Internal(format!("QR task panicked: {e}")))??;
        Ok(QrImage {
            png,
            source_url: None,
        })
    }
}

fn render_png(data: &str, size: u32) -> Result<Bytes, ToolError> {
    let code = QrCode::new(data.as_bytes()).map_err(|e| {
        ValidationError::invalid_input(format!("Text cannot be encoded as a QR code: {e}"))
    })?;
    let width = code.width();
    let colors = code.to_colors();
    let modules = width + 2 * QUIET_ZONE;
    let scale = (size as usize).div_ceil(modules).max(1);
    let px = (modules * scale) as u32;

    let img = GrayImage::from_fn(px, px, |x, y| {
        let mx = (x as usize / scale).checked_sub(QUIET_ZONE);
        let my = (y as usize / scale).checked_sub(QUIET_ZONE);
        match (mx, my) {
            (Some(mx), Some(my)) if mx < width && my < width => {
                if colors[my * width + mx] == Color::Dark {
                    Luma([0])
                } else {
                    Luma([255])
                }
            }
            _ => Luma([255]),
        }
    });

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| ToolError::Internal(format!("PNG encoding failed: {e}")))?;
    debug!("Encoded {width}-module QR at {px}px");
    Ok(Bytes::from(buf.into_inner()))
}

// ── Tool ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QrArtifact {
    #[serde(skip)]
    pub png: Bytes,
    pub size: u32,
    pub data: String,
    pub source_url: Option<String>,
}

impl Artifact for QrArtifact {
    fn summary(&self) -> Vec<String> {
        vec![
            format!("QR code ready ({0}×{0} px)", self.size),
            format!("Encodes: {}", self.data),
        ]
    }

    fn downloads(&self) -> Vec<Download> {
        vec![Download::bytes(DOWNLOAD_NAME, "image/png", self.png.clone())]
    }
}

/// Text or URL in, QR code PNG out.
#[derive(Clone)]
pub struct QrTool {
    provider: Arc<dyn QrProvider>,
}

impl QrTool {
    pub fn new(provider: Arc<dyn QrProvider>) -> Self {
        Self { provider }
    }

    /// Remote provider at the configured QR API base.
    pub fn online(config: &PipelineConfig, client: BackendClient) -> Self {
        Self::new(Arc::new(QrServerProvider::new(
            client,
            config.qr_api_base.clone(),
        )))
    }

    pub fn offline() -> Self {
        Self::new(Arc::new(LocalQrProvider))
    }
}

#[async_trait]
impl Tool for QrTool {
    type Output = QrArtifact;

    fn name(&self) -> &'static str {
        NAME
    }

    fn constraints(&self) -> Constraints {
        Constraints::text("text or a URL", MAX_QR_BYTES)
    }

    fn options(&self) -> Vec<OptionSpec> {
        vec![OptionSpec::integer("size", 100, 1000, 300)]
    }

    async fn process(&self, request: &ToolRequest) -> Result<QrArtifact, ToolError> {
        let data = request.payload.as_text().unwrap_or_default();
        let size = request.parameters.get_u32("size")?;
        let image = self.provider.generate(data, size).await?;
        Ok(QrArtifact {
            png: image.png,
            size,
            data: data.to_string(),
            source_url: image.source_url,
        })
    }
}
