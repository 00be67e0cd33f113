//! Result types produced by a completed remote call.
//!
//! [`ToolResult<T>`] is a tagged union: each tool fixes `T` to its own
//! artifact type, so a caller of the image converter gets a
//! [`crate::tools::image::ProcessedImage`] and never has to guess which JSON
//! fields a particular endpoint filled in.

use crate::error::ToolError;
use bytes::Bytes;
use serde::Serialize;

/// Something a successful tool run produced.
pub trait Artifact: Send + Sync {
    /// Human-readable lines describing the artifact.
    fn summary(&self) -> Vec<String>;

    /// Downloadable items, in the order the backend returned them.
    fn downloads(&self) -> Vec<Download> {
        Vec::new()
    }
}

/// The content behind one download action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DownloadContent {
    /// Blob already in memory.
    Bytes {
        mime: String,
        #[serde(skip)]
        bytes: Bytes,
    },
    /// Fetched from `url` when downloaded (absolute, or relative to the API base).
    Remote { url: String },
}

/// One independently downloadable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Download {
    /// Suggested file name.
    pub name: String,
    pub content: DownloadContent,
}

impl Download {
    pub fn bytes(name: impl Into<String>, mime: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            name: name.into(),
            content: DownloadContent::Bytes {
                mime: mime.into(),
                bytes,
            },
        }
    }

    pub fn remote(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: DownloadContent::Remote { url: url.into() },
        }
    }
}

/// Outcome of exactly one remote processing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResult<T> {
    Succeeded {
        artifact: T,
        /// Name of the primary download, if the artifact has one.
        download_name: Option<String>,
    },
    Failed {
        error: ToolError,
    },
}

impl<T: Artifact> ToolResult<T> {
    /// Wrap a produced artifact, taking the download name from its first item.
    pub fn succeeded(artifact: T) -> Self {
        let download_name = artifact.downloads().first().map(|d| d.name.clone());
        ToolResult::Succeeded {
            artifact,
            download_name,
        }
    }
}

impl<T> ToolResult<T> {
    pub fn failed(error: ToolError) -> Self {
        ToolResult::Failed { error }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Succeeded { .. })
    }

    pub fn artifact(&self) -> Option<&T> {
        match self {
            ToolResult::Succeeded { artifact, .. } => Some(artifact),
            ToolResult::Failed { .. } => None,
        }
    }

    pub fn download_name(&self) -> Option<&str> {
        match self {
            ToolResult::Succeeded { download_name, .. } => download_name.as_deref(),
            ToolResult::Failed { .. } => None,
        }
    }

    /// Present iff the call failed.
    pub fn error(&self) -> Option<&ToolError> {
        match self {
            ToolResult::Succeeded { .. } => None,
            ToolResult::Failed { error } => Some(error),
        }
    }

    pub fn into_result(self) -> Result<T, ToolError> {
        match self {
            ToolResult::Succeeded { artifact, .. } => Ok(artifact),
            ToolResult::Failed { error } => Err(error),
        }
    }
}
