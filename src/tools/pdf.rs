//! PDF operations. The heavy lifting happens on the backend; the tool only
//! uploads the document and hands back a link to the produced file.

use crate::client::{envelope_failure, file_part, BackendClient};
use crate::config::{Constraints, OptionSpec};
use crate::error::ToolError;
use crate::request::ToolRequest;
use crate::result::{Artifact, Download};
use crate::tool::Tool;
use async_trait::async_trait;
use reqwest::multipart::Form;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_PDF_BYTES: u64 = 25 * 1024 * 1024;

pub const COMPRESSION_LEVELS: &[&str] = &["low", "medium", "high"];

/// Longest watermark text accepted, in characters.
pub const MAX_WATERMARK_CHARS: usize = 100;

/// Which backend operation a [`PdfTool`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PdfOperation {
    ConvertToWord,
    /// Option `level`: low | medium | high.
    Compress,
    /// Option `text`: the watermark, required.
    Watermark,
}

impl PdfOperation {
    pub fn tool_name(self) -> &'static str {
        match self {
            PdfOperation::ConvertToWord => "pdf-to-word",
            PdfOperation::Compress => "pdf-compress",
            PdfOperation::Watermark => "pdf-watermark",
        }
    }

    fn endpoint(self) -> &'static str {
        match self {
            PdfOperation::ConvertToWord => "/api/pdf/convert-to-word",
            PdfOperation::Compress => "/api/pdf/compress",
            PdfOperation::Watermark => "/api/pdf/watermark",
        }
    }

    fn verb(self) -> &'static str {
        match self {
            PdfOperation::ConvertToWord => "Converted",
            PdfOperation::Compress => "Compressed",
            PdfOperation::Watermark => "Watermarked",
        }
    }
}

impl fmt::Display for PdfOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_name())
    }
}

/// Link to a file the backend produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdfArtifact {
    pub operation: PdfOperation,
    /// Absolute, or relative to the API base.
    pub download_url: String,
    pub file_name: String,
    pub message: Option<String>,
}

impl Artifact for PdfArtifact {
    fn summary(&self) -> Vec<String> {
        let mut lines = vec![format!("{} → {}", self.operation.verb(), self.file_name)];
        lines.extend(self.message.clone());
        lines
    }

    fn downloads(&self) -> Vec<Download> {
        vec![Download::remote(
            self.file_name.clone(),
            self.download_url.clone(),
        )]
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PdfResponse {
    #[serde(default)]
    success: bool,
    download_url: Option<String>,
    converted_file_name: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

/// Upload a PDF to one of the `/api/pdf/*` endpoints.
#[derive(Debug, Clone)]
pub struct PdfTool {
    client: BackendClient,
    operation: PdfOperation,
}

impl PdfTool {
    pub fn new(client: BackendClient, operation: PdfOperation) -> Self {
        Self { client, operation }
    }
}

#[async_trait]
impl Tool for PdfTool {
    type Output = PdfArtifact;

    fn name(&self) -> &'static str {
        self.operation.tool_name()
    }

    fn constraints(&self) -> Constraints {
        Constraints::file(&["application/pdf"], MAX_PDF_BYTES)
    }

    fn options(&self) -> Vec<OptionSpec> {
        match self.operation {
            PdfOperation::ConvertToWord => Vec::new(),
            PdfOperation::Compress => {
                vec![OptionSpec::choice("level", COMPRESSION_LEVELS, "medium")]
            }
            PdfOperation::Watermark => {
                vec![OptionSpec::text("text", MAX_WATERMARK_CHARS, true)]
            }
        }
    }

    async fn process(&self, request: &ToolRequest) -> Result<PdfArtifact, ToolError> {
        let file = request
            .payload
            .as_file()
            .ok_or_else(|| ToolError::Internal("PDF tool received text input".into()))?;

        let mut form = Form::new().part("pdf", file_part(file)?);
        for (name, value) in request.parameters.iter() {
            form = form.text(name.to_string(), value.to_string());
        }

        let resp: PdfResponse = self
            .client
            .post_multipart(self.operation.endpoint(), form)
            .await?;
        if !resp.success {
            return Err(envelope_failure(resp.error, resp.message));
        }
        let download_url = resp
            .download_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ToolError::Server {
                status: 200,
                message: "The server returned no download link".into(),
            })?;
        let file_name = resp
            .converted_file_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| fallback_name(self.operation, file.stem()));

        Ok(PdfArtifact {
            operation: self.operation,
            download_url,
            file_name,
            message: resp.message,
        })
    }
}

fn fallback_name(operation: PdfOperation, stem: &str) -> String {
    match operation {
        PdfOperation::ConvertToWord => format!("{stem}.docx"),
        PdfOperation::Compress => format!("{stem}-compressed.pdf"),
        PdfOperation::Watermark => format!("{stem}-watermarked.pdf"),
    }
}
