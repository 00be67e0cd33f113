//! YouTube title optimiser: upload a thumbnail, then ask for better titles.

use crate::client::{file_part, BackendClient};
use crate::config::{Constraints, OptionSpec};
use crate::error::ToolError;
use crate::request::ToolRequest;
use crate::result::Artifact;
use crate::tool::Tool;
use async_trait::async_trait;
use reqwest::multipart::Form;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

pub const NAME: &str = "title-optimizer";

pub const MAX_THUMBNAIL_BYTES: u64 = 5 * 1024 * 1024;

pub const MAX_TITLE_CHARS: usize = 100;

/// The stored thumbnail as the backend reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedThumbnail {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Thumbnail ids come back as numbers from some deployments.
fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "thumbnail id must be a string or number, got {other}"
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleSuggestion {
    pub title: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleOptimization {
    pub original_title: String,
    pub thumbnail: UploadedThumbnail,
    /// In the order the backend ranked them.
    pub suggestions: Vec<TitleSuggestion>,
    /// Backend-specific analysis, passed through untouched.
    pub optimization: serde_json::Value,
}

impl Artifact for TitleOptimization {
    fn summary(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} title suggestions for \"{}\"",
            self.suggestions.len(),
            self.original_title
        )];
        for (i, s) in self.suggestions.iter().enumerate() {
            let score = s.score.map(|v| format!(" [{v:.0}]")).unwrap_or_default();
            lines.push(format!("{}. {}{}", i + 1, s.title, score));
        }
        lines
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    thumbnail: UploadedThumbnail,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OptimizeRequest<'a> {
    original_title: &'a str,
    thumbnail_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct OptimizeResponse {
    #[serde(default)]
    suggestions: Vec<TitleSuggestion>,
    #[serde(default)]
    optimization: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct TitleOptimizerTool {
    client: BackendClient,
}

impl TitleOptimizerTool {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for TitleOptimizerTool {
    type Output = TitleOptimization;

    fn name(&self) -> &'static str {
        NAME
    }

    fn constraints(&self) -> Constraints {
        Constraints::file(
            &["image/png", "image/jpeg", "image/webp"],
            MAX_THUMBNAIL_BYTES,
        )
    }

    fn options(&self) -> Vec<OptionSpec> {
        vec![OptionSpec::text("title", MAX_TITLE_CHARS, true)]
    }

    async fn process(&self, request: &ToolRequest) -> Result<TitleOptimization, ToolError> {
        let file = request
            .payload
            .as_file()
            .ok_or_else(|| ToolError::Internal("title optimizer received text input".into()))?;
        let title = request.parameters.require("title")?;

        let form = Form::new().part("thumbnail", file_part(file)?);
        let uploaded: UploadResponse = self
            .client
            .post_multipart("/api/thumbnails/upload", form)
            .await?;
        debug!("Uploaded thumbnail id={}", uploaded.thumbnail.id);

        let body = OptimizeRequest {
            original_title: title,
            thumbnail_id: &uploaded.thumbnail.id,
        };
        let optimized: OptimizeResponse = self
            .client
            .post_json("/api/titles/optimize", &body)
            .await?;

        Ok(TitleOptimization {
            original_title: title.to_string(),
            thumbnail: uploaded.thumbnail,
            suggestions: optimized.suggestions,
            optimization: optimized.optimization,
        })
    }
}
