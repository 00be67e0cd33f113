//! Local preview: render the acquired input without touching the network.
//!
//! Images are fully decoded (inside `spawn_blocking`, decoding a 10 MB JPEG
//! is CPU-bound) so a corrupt upload fails here instead of at the backend.
//! The preview carries the *original* bytes as a base64 data URL; nothing is
//! re-encoded, and the payload the request holds is only ever borrowed.

use crate::error::{human_size, ToolError};
use crate::request::{FilePayload, Payload, ToolRequest};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use serde::Serialize;
use tracing::debug;

/// Longest text excerpt shown in a preview, in characters.
pub const EXCERPT_CHARS: usize = 120;

/// Renderable representation of an acquired input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PreviewHandle {
    Image {
        name: String,
        mime: String,
        width: u32,
        height: u32,
        size: u64,
        #[serde(skip)]
        data_url: String,
    },
    Document {
        name: String,
        mime: String,
        size: u64,
        /// Page estimate for PDFs.
        pages: Option<usize>,
    },
    Text {
        chars: usize,
        excerpt: String,
    },
}

impl PreviewHandle {
    /// One-line description for terminals and toasts.
    pub fn describe(&self) -> String {
        match self {
            PreviewHandle::Image {
                name,
                width,
                height,
                size,
                ..
            } => format!("{name}: {width}×{height} px, {}", human_size(*size)),
            PreviewHandle::Document {
                name, size, pages, ..
            } => match pages {
                Some(n) => format!("{name}: {n} page(s), {}", human_size(*size)),
                None => format!("{name}: {}", human_size(*size)),
            },
            PreviewHandle::Text { chars, excerpt } => format!("{chars} chars: \"{excerpt}\""),
        }
    }
}

/// Build the preview for a validated request.
pub async fn preview(request: &ToolRequest) -> Result<PreviewHandle, ToolError> {
    match &request.payload {
        Payload::Text(text) => Ok(preview_text(text)),
        Payload::File(file) if is_raster(&file.mime) => {
            let file = file.clone();
            tokio::task::spawn_blocking(move || preview_image(&file))
                .await
                .map_err(|e| ToolError::Internal(format!("Preview task panicked: {e}")))?
        }
        Payload::File(file) => Ok(preview_document(file)),
    }
}

fn is_raster(mime: &str) -> bool {
    mime.starts_with("image/") && image::ImageFormat::from_mime_type(mime).is_some()
}

fn preview_image(file: &FilePayload) -> Result<PreviewHandle, ToolError> {
    let img = image::load_from_memory(&file.bytes).map_err(|e| ToolError::Preview {
        detail: format!("{}: {e}", file.name),
    })?;
    debug!(
        "Previewed {} ({}×{}, {} bytes)",
        file.name,
        img.width(),
        img.height(),
        file.bytes.len()
    );
    Ok(PreviewHandle::Image {
        name: file.name.clone(),
        mime: file.mime.clone(),
        width: img.width(),
        height: img.height(),
        size: file.size(),
        data_url: to_data_url(&file.mime, &file.bytes),
    })
}

static RE_PDF_PAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/Type\s*/Page(?-u:[^s]|$)").unwrap());

fn preview_document(file: &FilePayload) -> PreviewHandle {
    let pages = (file.mime == "application/pdf")
        .then(|| RE_PDF_PAGE.find_iter(&file.bytes).count())
        .filter(|n| *n > 0);
    PreviewHandle::Document {
        name: file.name.clone(),
        mime: file.mime.clone(),
        size: file.size(),
        pages,
    }
}

fn preview_text(text: &str) -> PreviewHandle {
    let trimmed = text.trim();
    let chars = trimmed.chars().count();
    let mut excerpt: String = trimmed.chars().take(EXCERPT_CHARS).collect();
    if chars > EXCERPT_CHARS {
        excerpt.push('…');
    }
    PreviewHandle::Text { chars, excerpt }
}

/// `data:<mime>;base64,<payload>`
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}
