//! Request types: raw user input and the validated [`ToolRequest`].
//!
//! A [`RawInput`] is whatever the user handed over (a dropped file, a picked
//! file, a typed string). It becomes a [`ToolRequest`] only by passing
//! [`crate::pipeline::input::acquire`], so holding a `ToolRequest` means the
//! payload already satisfies the tool's constraints.

use crate::error::{ToolError, ValidationError};
use bytes::Bytes;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Entry point the file came through. Informational only: every source is
/// validated by the same code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    DragDrop,
    Picker,
    Path,
}

/// Unvalidated user input.
#[derive(Debug, Clone)]
pub enum RawInput {
    File {
        name: String,
        bytes: Bytes,
        declared_mime: Option<String>,
        source: InputSource,
    },
    Text(String),
}

impl RawInput {
    /// A file dropped onto the upload area.
    pub fn dropped(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        RawInput::File {
            name: name.into(),
            bytes: bytes.into(),
            declared_mime: None,
            source: InputSource::DragDrop,
        }
    }

    /// A file chosen through the browse dialog.
    pub fn picked(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        RawInput::File {
            name: name.into(),
            bytes: bytes.into(),
            declared_mime: None,
            source: InputSource::Picker,
        }
    }

    /// Text typed into the tool's input field.
    pub fn text(s: impl Into<String>) -> Self {
        RawInput::Text(s.into())
    }

    /// Attach the MIME type the browser (or caller) claims for the file.
    pub fn with_declared_mime(self, mime: impl Into<String>) -> Self {
        match self {
            RawInput::File {
                name,
                bytes,
                source,
                ..
            } => RawInput::File {
                name,
                bytes,
                declared_mime: Some(mime.into()),
                source,
            },
            text => text,
        }
    }

    /// Read a local file into a `RawInput`.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ToolError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ToolError::io(path.display(), e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        debug!("Read {} bytes from {}", bytes.len(), path.display());
        Ok(RawInput::File {
            name,
            bytes: Bytes::from(bytes),
            declared_mime: None,
            source: InputSource::Path,
        })
    }
}

/// A validated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    pub name: String,
    pub mime: String,
    pub bytes: Bytes,
}

impl FilePayload {
    /// File name without its extension, used to derive download names.
    pub fn stem(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Validated input content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    File(FilePayload),
    Text(String),
}

impl Payload {
    pub fn as_file(&self) -> Option<&FilePayload> {
        match self {
            Payload::File(f) => Some(f),
            Payload::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(t) => Some(t),
            Payload::File(_) => None,
        }
    }
}

/// Option values keyed by option name. After `acquire` every declared option
/// is present (explicit value or default) and normalised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Parameters(BTreeMap<String, String>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Fetch a value that validation guarantees to exist.
    pub fn require(&self, name: &str) -> Result<&str, ValidationError> {
        self.get(name)
            .ok_or_else(|| ValidationError::invalid_parameter(name, "is required"))
    }

    pub fn get_u32(&self, name: &str) -> Result<u32, ValidationError> {
        let raw = self.require(name)?;
        raw.parse()
            .map_err(|_| ValidationError::invalid_parameter(name, format!("'{raw}' is not a number")))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// One validated tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequest {
    pub tool: String,
    pub payload: Payload,
    pub parameters: Parameters,
}
