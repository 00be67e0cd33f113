//! YouTube thumbnail downloader.
//!
//! No API call is made: the thumbnail URLs are derived from the video id,
//! and the images are only fetched when a download is requested.

use crate::config::{Constraints, PipelineConfig, DEFAULT_THUMBNAIL_CDN};
use crate::error::{ToolError, ValidationError};
use crate::request::ToolRequest;
use crate::result::{Artifact, Download};
use crate::tool::Tool;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

pub const NAME: &str = "youtube-thumbnails";

static RE_BARE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap());

static RE_VIDEO_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i:youtube\.com/(?:watch\?(?:[^#]*&)?v=|shorts/|embed/|live/|v/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[?&#/]|$)",
    )
    .unwrap()
});

/// Extract the 11-character video id from a YouTube URL or a bare id.
pub fn parse_video_id(input: &str) -> Result<String, ValidationError> {
    let input = input.trim();
    if RE_BARE_ID.is_match(input) {
        return Ok(input.to_string());
    }
    RE_VIDEO_URL
        .captures(input)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ValidationError::invalid_input("Please enter a valid YouTube URL"))
}

/// Thumbnail sizes YouTube publishes for every video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailVariant {
    MaxResDefault,
    HqDefault,
    MqDefault,
    Default,
}

impl ThumbnailVariant {
    /// Largest first.
    pub const ALL: [ThumbnailVariant; 4] = [
        ThumbnailVariant::MaxResDefault,
        ThumbnailVariant::HqDefault,
        ThumbnailVariant::MqDefault,
        ThumbnailVariant::Default,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ThumbnailVariant::MaxResDefault => "maxresdefault",
            ThumbnailVariant::HqDefault => "hqdefault",
            ThumbnailVariant::MqDefault => "mqdefault",
            ThumbnailVariant::Default => "default",
        }
    }

    /// Nominal `(width, height)` in pixels.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            ThumbnailVariant::MaxResDefault => (1280, 720),
            ThumbnailVariant::HqDefault => (480, 360),
            ThumbnailVariant::MqDefault => (320, 180),
            ThumbnailVariant::Default => (120, 90),
        }
    }
}

impl fmt::Display for ThumbnailVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where thumbnail images live.
pub trait ThumbnailCdn: Send + Sync {
    fn url(&self, video_id: &str, variant: ThumbnailVariant) -> String;
}

/// `{base}/{id}/{variant}.jpg`
#[derive(Debug, Clone)]
pub struct YoutubeCdn {
    base: String,
}

impl YoutubeCdn {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for YoutubeCdn {
    fn default() -> Self {
        Self::new(DEFAULT_THUMBNAIL_CDN)
    }
}

impl ThumbnailCdn for YoutubeCdn {
    fn url(&self, video_id: &str, variant: ThumbnailVariant) -> String {
        format!("{}/{}/{}.jpg", self.base, video_id, variant)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Thumbnail {
    pub variant: ThumbnailVariant,
    pub width: u32,
    pub height: u32,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThumbnailSet {
    pub video_id: String,
    pub thumbnails: Vec<Thumbnail>,
}

impl Artifact for ThumbnailSet {
    fn summary(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} thumbnails for video {}",
            self.thumbnails.len(),
            self.video_id
        )];
        lines.extend(
            self.thumbnails
                .iter()
                .map(|t| format!("{} ({}×{}): {}", t.variant, t.width, t.height, t.url)),
        );
        lines
    }

    fn downloads(&self) -> Vec<Download> {
        self.thumbnails
            .iter()
            .map(|t| Download::remote(format!("{}-{}.jpg", self.video_id, t.variant), t.url.clone()))
            .collect()
    }
}

#[derive(Clone)]
pub struct YoutubeThumbnailTool {
    cdn: Arc<dyn ThumbnailCdn>,
}

impl YoutubeThumbnailTool {
    pub fn new(cdn: Arc<dyn ThumbnailCdn>) -> Self {
        Self { cdn }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(Arc::new(YoutubeCdn::new(config.thumbnail_cdn_base.clone())))
    }

    /// Every variant's URL for `video_id`, largest first.
    pub fn thumbnails(&self, video_id: &str) -> ThumbnailSet {
        let thumbnails = ThumbnailVariant::ALL
            .iter()
            .map(|&variant| {
                let (width, height) = variant.dimensions();
                Thumbnail {
                    variant,
                    width,
                    height,
                    url: self.cdn.url(video_id, variant),
                }
            })
            .collect();
        ThumbnailSet {
            video_id: video_id.to_string(),
            thumbnails,
        }
    }
}

impl Default for YoutubeThumbnailTool {
    fn default() -> Self {
        Self::new(Arc::new(YoutubeCdn::default()))
    }
}

#[async_trait]
impl Tool for YoutubeThumbnailTool {
    type Output = ThumbnailSet;

    fn name(&self) -> &'static str {
        NAME
    }

    fn constraints(&self) -> Constraints {
        Constraints::text("a YouTube URL", 2048)
    }

    fn validate(&self, request: &ToolRequest) -> Result<(), ValidationError> {
        parse_video_id(request.payload.as_text().unwrap_or_default()).map(|_| ())
    }

    async fn process(&self, request: &ToolRequest) -> Result<ThumbnailSet, ToolError> {
        let id = parse_video_id(request.payload.as_text().unwrap_or_default())?;
        Ok(self.thumbnails(&id))
    }
}
