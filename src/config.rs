//! Configuration types for tool pipelines.
//!
//! Pipeline-wide behaviour (which backend to talk to, how long to wait) is
//! controlled through [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. Per-tool input rules live next to the tool in
//! [`Constraints`] and [`OptionSpec`]; the pipeline enforces them uniformly so
//! no tool carries its own validation path.

use crate::error::{ToolError, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default API origin when none is configured.
pub const DEFAULT_API_BASE: &str = "http://localhost:5000";

/// Default QR Server API origin.
pub const DEFAULT_QR_API_BASE: &str = "https://api.qrserver.com";

/// Default YouTube thumbnail CDN prefix.
pub const DEFAULT_THUMBNAIL_CDN: &str = "https://img.youtube.com/vi";

/// Configuration shared by every pipeline and backend client.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use ginywow_tools::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .api_base_url("https://ginywow.example")
///     .request_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.request_timeout_secs, 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Origin of the processing backend (`/api/...` paths are joined onto it).
    pub api_base_url: String,

    /// Upper bound on one remote processing call, in seconds. Default: 60.
    ///
    /// Enforced around the whole `Tool::process` future, so a tool that makes
    /// two requests (upload, then optimise) shares one budget.
    pub request_timeout_secs: u64,

    /// Upper bound on fetching a remote artifact for download. Default: 120.
    pub download_timeout_secs: u64,

    /// Origin of the QR image API.
    pub qr_api_base: String,

    /// Prefix of the YouTube thumbnail CDN.
    pub thumbnail_cdn_base: String,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,

    /// Replaces every file tool's own byte ceiling when set.
    pub max_upload_bytes_override: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE.to_string(),
            request_timeout_secs: 60,
            download_timeout_secs: 120,
            qr_api_base: DEFAULT_QR_API_BASE.to_string(),
            thumbnail_cdn_base: DEFAULT_THUMBNAIL_CDN.to_string(),
            user_agent: concat!("ginywow-tools/", env!("CARGO_PKG_VERSION")).to_string(),
            max_upload_bytes_override: None,
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn qr_api_base(mut self, url: impl Into<String>) -> Self {
        self.config.qr_api_base = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn thumbnail_cdn_base(mut self, url: impl Into<String>) -> Self {
        self.config.thumbnail_cdn_base = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_upload_bytes_override = Some(bytes);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, ToolError> {
        let c = &self.config;
        for (name, url) in [
            ("api_base_url", &c.api_base_url),
            ("qr_api_base", &c.qr_api_base),
            ("thumbnail_cdn_base", &c.thumbnail_cdn_base),
        ] {
            match reqwest::Url::parse(url) {
                Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
                _ => {
                    return Err(ToolError::InvalidConfig(format!(
                        "{name} must be an http(s) URL, got '{url}'"
                    )))
                }
            }
        }
        if c.request_timeout_secs == 0 || c.download_timeout_secs == 0 {
            return Err(ToolError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.max_upload_bytes_override == Some(0) {
            return Err(ToolError::InvalidConfig(
                "Upload ceiling must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Input rules ──────────────────────────────────────────────────────────

/// Which shape of payload a tool accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// A binary file (upload, drag-and-drop, local path).
    File,
    /// A text field (URL, date, free text, number).
    Text,
}

/// Declared limits a payload must satisfy before it may be submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    pub input: InputKind,
    /// MIME allow-list; `"image/*"` style wildcards match a whole family.
    /// Empty means any type. Ignored for text input.
    pub allowed_types: Vec<String>,
    /// Byte ceiling on the payload (file bytes or UTF-8 text length).
    pub max_bytes: Option<u64>,
    /// Human label used in the empty-input message, e.g. `"a YouTube URL"`.
    pub label: String,
}

impl Constraints {
    /// File input restricted to `types`, at most `max_bytes`.
    pub fn file(types: &[&str], max_bytes: u64) -> Self {
        Self {
            input: InputKind::File,
            allowed_types: types.iter().map(|t| t.to_string()).collect(),
            max_bytes: Some(max_bytes),
            label: "a file".to_string(),
        }
    }

    /// Required text input, at most `max_bytes` of UTF-8.
    pub fn text(label: impl Into<String>, max_bytes: u64) -> Self {
        Self {
            input: InputKind::Text,
            allowed_types: Vec::new(),
            max_bytes: Some(max_bytes),
            label: label.into(),
        }
    }

    /// Whether `mime` is in the allow-list.
    pub fn allows(&self, mime: &str) -> bool {
        if self.allowed_types.is_empty() {
            return true;
        }
        let mime = mime.to_ascii_lowercase();
        self.allowed_types.iter().any(|allowed| {
            match allowed.strip_suffix("/*") {
                Some(family) => mime
                    .split_once('/')
                    .is_some_and(|(top, _)| top == family),
                None => *allowed == mime,
            }
        })
    }
}

/// Value domain of one tool option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OptionKind {
    /// One of a fixed set (case-insensitive, stored lowercase).
    Choice { values: Vec<String> },
    /// Integer in `min..=max`.
    Integer { min: i64, max: i64 },
    /// Free text up to `max_len` characters.
    Text { max_len: usize },
    /// Calendar date, `YYYY-MM-DD`.
    Date,
}

/// Declaration of one option a tool accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSpec {
    pub name: String,
    pub kind: OptionKind,
    /// Used when the caller leaves the option unset.
    pub default: Option<String>,
    /// Unset + no default is rejected when this is true.
    pub required: bool,
}

impl OptionSpec {
    pub fn choice(name: &str, values: &[&str], default: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: OptionKind::Choice {
                values: values.iter().map(|v| v.to_string()).collect(),
            },
            default: Some(default.to_string()),
            required: true,
        }
    }

    pub fn integer(name: &str, min: i64, max: i64, default: i64) -> Self {
        Self {
            name: name.to_string(),
            kind: OptionKind::Integer { min, max },
            default: Some(default.to_string()),
            required: true,
        }
    }

    pub fn text(name: &str, max_len: usize, required: bool) -> Self {
        Self {
            name: name.to_string(),
            kind: OptionKind::Text { max_len },
            default: None,
            required,
        }
    }

    /// Drop the default so the caller must supply a value.
    pub fn without_default(mut self) -> Self {
        self.default = None;
        self
    }

    pub fn date(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: OptionKind::Date,
            default: None,
            required: false,
        }
    }

    /// Validate `raw` and return its normalised form.
    pub fn normalise(&self, raw: &str) -> Result<String, ValidationError> {
        let value = raw.trim();
        match &self.kind {
            OptionKind::Choice { values } => {
                let lower = value.to_ascii_lowercase();
                if values.iter().any(|v| *v == lower) {
                    Ok(lower)
                } else {
                    Err(ValidationError::invalid_parameter(
                        &self.name,
                        format!("'{value}' is not one of {}", values.join(", ")),
                    ))
                }
            }
            OptionKind::Integer { min, max } => match value.parse::<i64>() {
                Ok(n) if (*min..=*max).contains(&n) => Ok(n.to_string()),
                Ok(n) => Err(ValidationError::invalid_parameter(
                    &self.name,
                    format!("{n} is outside {min}–{max}"),
                )),
                Err(_) => Err(ValidationError::invalid_parameter(
                    &self.name,
                    format!("'{value}' is not a whole number"),
                )),
            },
            OptionKind::Text { max_len } => {
                if self.required && value.is_empty() {
                    return Err(ValidationError::invalid_parameter(&self.name, "is required"));
                }
                if value.chars().count() > *max_len {
                    return Err(ValidationError::invalid_parameter(
                        &self.name,
                        format!("must be at most {max_len} characters"),
                    ));
                }
                Ok(value.to_string())
            }
            OptionKind::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(|d| d.format("%Y-%m-%d").to_string())
                .map_err(|_| {
                    ValidationError::invalid_parameter(
                        &self.name,
                        format!("'{value}' is not a YYYY-MM-DD date"),
                    )
                }),
        }
    }
}
