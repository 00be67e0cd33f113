//! Image format conversion and background removal.
//!
//! Both endpoints answer with the same envelope:
//! `{ success, processedImage: "data:<mime>;base64,…", downloadName?, error? }`.

use crate::client::{envelope_failure, file_part, BackendClient};
use crate::config::{Constraints, OptionSpec};
use crate::error::{human_size, ToolError};
use crate::pipeline::input::extension_for_mime;
use crate::pipeline::render::decode_data_url;
use crate::request::{FilePayload, ToolRequest};
use crate::result::{Artifact, Download};
use crate::tool::Tool;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::Form;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CONVERT_NAME: &str = "convert-image";
pub const REMOVE_BG_NAME: &str = "remove-background";

const MB: u64 = 1024 * 1024;

/// Upload ceiling shared by both image tools.
pub const MAX_IMAGE_BYTES: u64 = 10 * MB;

/// Output formats the converter offers.
pub const FORMATS: &[&str] = &["png", "jpeg", "webp", "gif", "bmp", "tiff"];

const CONVERT_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/webp",
    "image/gif",
    "image/bmp",
    "image/tiff",
];

const REMOVE_BG_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp"];

/// An image returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedImage {
    pub mime: String,
    #[serde(skip)]
    pub bytes: Bytes,
    /// The server's data URL, kept for inline display.
    #[serde(skip)]
    pub data_url: String,
    pub download_name: String,
}

impl Artifact for ProcessedImage {
    fn summary(&self) -> Vec<String> {
        vec![format!(
            "{} ready ({})",
            self.download_name,
            human_size(self.bytes.len() as u64)
        )]
    }

    fn downloads(&self) -> Vec<Download> {
        vec![Download::bytes(
            self.download_name.clone(),
            self.mime.clone(),
            self.bytes.clone(),
        )]
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default = "default_true")]
    success: bool,
    processed_image: Option<String>,
    download_name: Option<String>,
    error: Option<String>,
    message: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ImageResponse {
    /// Validate the envelope and decode the image. `fallback_mime` is used
    /// when the server sent bare base64 without a `data:` prefix.
    fn into_image(self, fallback_name: String, fallback_mime: &str) -> Result<ProcessedImage, ToolError> {
        if !self.success {
            return Err(envelope_failure(self.error, self.message));
        }
        let data_url = self
            .processed_image
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ToolError::Server {
                status: 200,
                message: "The server returned no image".into(),
            })?;
        let (mime, bytes) = decode_data_url(&data_url)?;
        let mime = if mime == crate::pipeline::input::OCTET_STREAM {
            fallback_mime.to_string()
        } else {
            mime
        };
        debug!("Decoded {} ({} bytes)", mime, bytes.len());
        Ok(ProcessedImage {
            mime,
            bytes,
            data_url,
            download_name: self
                .download_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(fallback_name),
        })
    }
}

fn image_of(request: &ToolRequest) -> Result<&FilePayload, ToolError> {
    request
        .payload
        .as_file()
        .ok_or_else(|| ToolError::Internal("image tool received text input".into()))
}

// ── Format converter ─────────────────────────────────────────────────────

/// Convert an image to another format via `POST /api/convert-image`.
#[derive(Debug, Clone)]
pub struct ImageConvertTool {
    client: BackendClient,
}

impl ImageConvertTool {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ImageConvertTool {
    type Output = ProcessedImage;

    fn name(&self) -> &'static str {
        CONVERT_NAME
    }

    fn constraints(&self) -> Constraints {
        Constraints::file(CONVERT_TYPES, MAX_IMAGE_BYTES)
    }

    fn options(&self) -> Vec<OptionSpec> {
        vec![
            OptionSpec::choice("format", FORMATS, "png"),
            OptionSpec::integer("quality", 1, 100, 90),
        ]
    }

    async fn process(&self, request: &ToolRequest) -> Result<ProcessedImage, ToolError> {
        let file = image_of(request)?;
        let format = request.parameters.require("format")?.to_string();
        let quality = request.parameters.get_u32("quality")?;
        let target_mime = format!("image/{format}");

        let form = Form::new()
            .part("image", file_part(file)?)
            .text("format", format.clone())
            .text("quality", quality.to_string());

        let resp: ImageResponse = self.client.post_multipart("/api/convert-image", form).await?;
        let fallback = format!("{}.{}", file.stem(), extension_for_mime(&target_mime));
        resp.into_image(fallback, &target_mime)
    }
}

// ── Background removal ───────────────────────────────────────────────────

/// Cut out the subject of a photo via `POST /api/remove-background`.
#[derive(Debug, Clone)]
pub struct BackgroundRemovalTool {
    client: BackendClient,
}

impl BackgroundRemovalTool {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for BackgroundRemovalTool {
    type Output = ProcessedImage;

    fn name(&self) -> &'static str {
        REMOVE_BG_NAME
    }

    fn constraints(&self) -> Constraints {
        Constraints::file(REMOVE_BG_TYPES, MAX_IMAGE_BYTES)
    }

    async fn process(&self, request: &ToolRequest) -> Result<ProcessedImage, ToolError> {
        let file = image_of(request)?;
        let form = Form::new().part("image", file_part(file)?);
        let resp: ImageResponse = self
            .client
            .post_multipart("/api/remove-background", form)
            .await?;
        // The cut-out is always offered as a PNG under a derived name.
        let name = format!("{}-no-bg.png", file.stem());
        let mut image = resp.into_image(name.clone(), "image/png")?;
        image.download_name = name;
        Ok(image)
    }
}
