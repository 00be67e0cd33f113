//! Result rendering and download.
//!
//! [`render`] is pure presentation: it turns the latest [`ToolResult`] into
//! a [`RenderedView`] and never looks at earlier results. [`download`] saves
//! one item to disk, fetching it first when the backend returned a URL.

use crate::client::BackendClient;
use crate::error::ToolError;
use crate::result::{Artifact, Download, DownloadContent, ToolResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// What a tool page shows after a call resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedView {
    pub success: bool,
    pub headline: String,
    pub lines: Vec<String>,
    /// Ordered exactly as the artifact listed them.
    pub downloads: Vec<Download>,
    /// Taxonomy signal of the failure, if any.
    pub error_kind: Option<String>,
}

/// Present a result.
pub fn render<T: Artifact>(result: &ToolResult<T>) -> RenderedView {
    match result {
        ToolResult::Succeeded { artifact, .. } => {
            let mut lines = artifact.summary();
            let headline = if lines.is_empty() {
                "Done".to_string()
            } else {
                lines.remove(0)
            };
            RenderedView {
                success: true,
                headline,
                lines,
                downloads: artifact.downloads(),
                error_kind: None,
            }
        }
        ToolResult::Failed { error } => RenderedView {
            success: false,
            headline: error.user_message(),
            lines: Vec::new(),
            downloads: Vec::new(),
            error_kind: Some(error.kind().to_string()),
        },
    }
}

/// Save one download into `dir`, returning the written path.
///
/// The file is written to a temp file in `dir` and persisted under its final
/// name, so an interrupted download never leaves a truncated artifact behind.
pub async fn download(
    item: &Download,
    dir: impl AsRef<Path>,
    client: &BackendClient,
) -> Result<PathBuf, ToolError> {
    let dir = dir.as_ref();
    let bytes = match &item.content {
        DownloadContent::Bytes { bytes, .. } => bytes.clone(),
        DownloadContent::Remote { url } => client.get_bytes(url).await?.1,
    };

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ToolError::io(dir.display(), e))?;

    let target = dir.join(sanitise_file_name(&item.name));
    let dir_owned = dir.to_path_buf();
    let target_owned = target.clone();
    tokio::task::spawn_blocking(move || write_atomic(&dir_owned, &target_owned, &bytes))
        .await
        .map_err(|e| ToolError::Internal(format!("Download task panicked: {e}")))??;

    info!("Saved {}", target.display());
    Ok(target)
}

fn write_atomic(dir: &Path, target: &Path, bytes: &[u8]) -> Result<(), ToolError> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ToolError::io(dir.display(), e))?;
    tmp.write_all(bytes)
        .map_err(|e| ToolError::io(target.display(), e))?;
    tmp.persist(target)
        .map_err(|e| ToolError::io(target.display(), e.error))?;
    Ok(())
}

/// Keep only the final path component and strip characters that are unsafe
/// in file names on common platforms.
pub fn sanitise_file_name(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = last
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "download".to_string()
    } else {
        cleaned
    }
}

/// Decode `data:<mime>;base64,<payload>` into its MIME type and bytes.
///
/// A bare base64 string (no `data:` prefix) is accepted as
/// `application/octet-stream`; some endpoints omit the prefix.
pub fn decode_data_url(data_url: &str) -> Result<(String, Bytes), ToolError> {
    let bad = |detail: &str| ToolError::Server {
        status: 200,
        message: format!("Malformed image data from server: {detail}"),
    };

    let (mime, payload) = match data_url.strip_prefix("data:") {
        Some(rest) => {
            let (meta, payload) = rest.split_once(',').ok_or_else(|| bad("missing ','"))?;
            let mime = meta
                .strip_suffix(";base64")
                .ok_or_else(|| bad("not base64-encoded"))?;
            let mime = if mime.is_empty() {
                "application/octet-stream"
            } else {
                mime
            };
            (mime.to_string(), payload)
        }
        None => ("application/octet-stream".to_string(), data_url),
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| bad(&e.to_string()))?;
    if bytes.is_empty() {
        return Err(bad("empty payload"));
    }
    Ok((mime, Bytes::from(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::pipeline::preview::to_data_url;

    #[derive(Debug, Clone)]
    struct Thumbs;

    impl Artifact for Thumbs {
        fn summary(&self) -> Vec<String> {
            vec!["3 thumbnails".into(), "video abc".into()]
        }

        fn downloads(&self) -> Vec<Download> {
            vec![
                Download::remote("c.jpg", "/c.jpg"),
                Download::remote("a.jpg", "/a.jpg"),
                Download::remote("b.jpg", "/b.jpg"),
            ]
        }
    }

    #[test]
    fn render_success_keeps_download_order() {
        let view = render(&ToolResult::succeeded(Thumbs));
        assert!(view.success);
        assert_eq!(view.headline, "3 thumbnails");
        assert_eq!(view.lines, vec!["video abc".to_string()]);
        let names: Vec<_> = view.downloads.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["c.jpg", "a.jpg", "b.jpg"]);
    }

    #[test]
    fn render_failure_shows_user_message() {
        let r: ToolResult<Thumbs> = ToolResult::failed(ToolError::Server {
            status: 500,
            message: "Background model unavailable".into(),
        });
        let view = render(&r);
        assert!(!view.success);
        assert_eq!(view.headline, "Background model unavailable");
        assert_eq!(view.error_kind.as_deref(), Some("ServerError"));
        assert!(view.downloads.is_empty());
    }

    #[test]
    fn data_url_round_trip() {
        let url = to_data_url("image/webp", b"RIFFxxxxWEBP");
        let (mime, bytes) = decode_data_url(&url).unwrap();
        assert_eq!(mime, "image/webp");
        assert_eq!(&bytes[..], b"RIFFxxxxWEBP");
    }

    #[test]
    fn malformed_data_url_is_server_error() {
        assert!(decode_data_url("data:image/png,notbase64").is_err());
        assert!(decode_data_url("data:image/png;base64,@@@").is_err());
        assert!(decode_data_url("").is_err());
    }

    #[test]
    fn file_names_are_sanitised() {
        assert_eq!(sanitise_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitise_file_name("C:\\temp\\out.png"), "out.png");
        assert_eq!(sanitise_file_name("a:b?.png"), "a_b_.png");
        assert_eq!(sanitise_file_name(".."), "download");
    }

    #[tokio::test]
    async fn download_bytes_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let client = BackendClient::new(&PipelineConfig::default()).unwrap();
        let item = Download::bytes("qr-code.png", "image/png", Bytes::from_static(b"png!"));
        let path = download(&item, dir.path(), &client).await.unwrap();
        assert_eq!(path, dir.path().join("qr-code.png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"png!");
    }

    #[tokio::test]
    async fn download_remote_fetches_relative_url() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/downloads/report.docx")
            .with_status(200)
            .with_body("docx-bytes")
            .expect(1)
            .create_async()
            .await;

        let config = PipelineConfig::builder().api_base_url(server.url()).build().unwrap();
        let client = BackendClient::new(&config).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let item = Download::remote("report.docx", "/downloads/report.docx");
        let path = download(&item, dir.path(), &client).await.unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "docx-bytes");
        m.assert_async().await;
    }
}
