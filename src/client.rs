//! HTTP client for the processing backend and external APIs.
//!
//! Every remote call in the crate goes through [`BackendClient`], so the
//! mapping from transport failures to the error taxonomy lives in exactly
//! one place:
//!
//! | Failure                                   | Error                     |
//! |-------------------------------------------|---------------------------|
//! | reqwest timeout                           | [`ToolError::Timeout`]    |
//! | DNS / connect / reset / body read         | [`ToolError::Network`]    |
//! | non-2xx status                            | [`ToolError::Server`]     |
//! | 2xx with a body that doesn't decode       | [`ToolError::Server`]     |

use crate::config::PipelineConfig;
use crate::error::ToolError;
use crate::request::FilePayload;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Thin wrapper over a shared `reqwest::Client` bound to one API origin.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base: String,
    request_timeout: Duration,
    download_timeout: Duration,
}

impl BackendClient {
    /// Build a client from a validated config.
    pub fn new(config: &PipelineConfig) -> Result<Self, ToolError> {
        let request_timeout = Duration::from_secs(config.request_timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ToolError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            base: config.api_base_url.trim_end_matches('/').to_string(),
            request_timeout,
            download_timeout: Duration::from_secs(config.download_timeout_secs),
        })
    }

    /// Resolve `url` against the API origin. Absolute URLs pass through.
    pub fn resolve(&self, url: &str) -> Result<Url, ToolError> {
        if let Ok(absolute) = Url::parse(url) {
            return Ok(absolute);
        }
        let joined = if url.starts_with('/') {
            format!("{}{}", self.base, url)
        } else {
            format!("{}/{}", self.base, url)
        };
        Url::parse(&joined).map_err(|e| ToolError::Internal(format!("Bad URL '{joined}': {e}")))
    }

    /// POST a multipart form and decode the JSON response.
    pub async fn post_multipart<R: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<R, ToolError> {
        let url = self.resolve(path)?;
        info!("POST {} (multipart)", url);
        let resp = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e, self.request_timeout))?;
        self.decode(resp).await
    }

    /// POST a JSON body and decode the JSON response.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ToolError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.resolve(path)?;
        info!("POST {} (json)", url);
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e, self.request_timeout))?;
        self.decode(resp).await
    }

    /// POST a JSON body with a bearer token; only the status matters.
    pub async fn post_json_authorised<B: Serialize + ?Sized>(
        &self,
        url: &str,
        token: &str,
        body: &B,
    ) -> Result<StatusCode, ToolError> {
        let url = self.resolve(url)?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e, self.request_timeout))?;
        let resp = ensure_status(resp).await?;
        Ok(resp.status())
    }

    /// GET raw bytes, returning the `Content-Type` alongside.
    pub async fn get_bytes(&self, url: &str) -> Result<(Option<String>, Bytes), ToolError> {
        let url = self.resolve(url)?;
        debug!("GET {}", url);
        let resp = self
            .http
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e, self.download_timeout))?;
        let resp = ensure_status(resp).await?;
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| self.transport_error(e, self.download_timeout))?;
        debug!("Fetched {} bytes", bytes.len());
        Ok((content_type, bytes))
    }

    async fn decode<R: DeserializeOwned>(&self, resp: Response) -> Result<R, ToolError> {
        let resp = ensure_status(resp).await?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| self.transport_error(e, self.request_timeout))?;
        serde_json::from_slice(&body).map_err(|e| ToolError::Server {
            status: status.as_u16(),
            message: format!("Unexpected response from server: {e}"),
        })
    }

    fn transport_error(&self, err: reqwest::Error, limit: Duration) -> ToolError {
        if err.is_timeout() {
            ToolError::Timeout {
                secs: limit.as_secs(),
            }
        } else {
            ToolError::Network {
                detail: err.to_string(),
            }
        }
    }
}

/// Turn a non-2xx response into [`ToolError::Server`].
async fn ensure_status(resp: Response) -> Result<Response, ToolError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ToolError::Server {
        status: status.as_u16(),
        message: server_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        }),
    })
}

/// Pull the human message out of an error body: JSON `error` / `message`
/// field first, then `errors[0].message` (SendGrid), then the raw text if it
/// is short and not HTML.
pub fn server_message(body: &str) -> Option<String> {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        let nested = json.pointer("/errors/0/message");
        return ["error", "message"]
            .iter()
            .filter_map(|key| json.get(key))
            .chain(nested)
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .find(|msg| !msg.is_empty())
            .map(str::to_string);
    }
    let text = body.trim();
    if text.is_empty() || text.starts_with('<') || text.len() > 300 {
        None
    } else {
        Some(text.to_string())
    }
}

/// Multipart part carrying a validated file with its name and MIME type.
pub fn file_part(file: &FilePayload) -> Result<Part, ToolError> {
    Part::bytes(file.bytes.to_vec())
        .file_name(file.name.clone())
        .mime_str(&file.mime)
        .map_err(|e| ToolError::Internal(format!("Bad MIME type '{}': {e}", file.mime)))
}

/// Map a `{ success: false, error }` envelope on a 2xx response to an error.
pub(crate) fn envelope_failure(error: Option<String>, message: Option<String>) -> ToolError {
    ToolError::Server {
        status: 200,
        message: error
            .or(message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> BackendClient {
        let config = PipelineConfig::builder().api_base_url(base).build().unwrap();
        BackendClient::new(&config).unwrap()
    }

    #[test]
    fn resolve_relative_and_absolute() {
        let c = client("https://ginywow.example/app");
        assert_eq!(
            c.resolve("/api/convert-image").unwrap().as_str(),
            "https://ginywow.example/app/api/convert-image"
        );
        assert_eq!(
            c.resolve("downloads/a.docx").unwrap().as_str(),
            "https://ginywow.example/app/downloads/a.docx"
        );
        assert_eq!(
            c.resolve("https://cdn.example/x.jpg").unwrap().as_str(),
            "https://cdn.example/x.jpg"
        );
    }

    #[test]
    fn server_message_prefers_json_fields() {
        assert_eq!(
            server_message(r#"{"error":"Image too dark"}"#).as_deref(),
            Some("Image too dark")
        );
        assert_eq!(
            server_message(r#"{"message":"Quota exceeded"}"#).as_deref(),
            Some("Quota exceeded")
        );
        assert_eq!(
            server_message(r#"{"errors":[{"message":"Permission denied","field":null}]}"#).as_deref(),
            Some("Permission denied")
        );
        assert_eq!(server_message(r#"{"status":"bad"}"#), None);
        assert_eq!(server_message("Bad Gateway").as_deref(), Some("Bad Gateway"));
        assert_eq!(server_message("<html>oops</html>"), None);
    }

    #[test]
    fn envelope_failure_uses_error_then_message() {
        let e = envelope_failure(None, Some("Conversion failed".into()));
        assert_eq!(e.user_message(), "Conversion failed");
    }

    #[tokio::test]
    async fn non_2xx_maps_to_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/api/remove-background")
            .with_status(503)
            .with_body(r#"{"error":"Model warming up"}"#)
            .create_async()
            .await;

        let c = client(&server.url());
        let err = c
            .post_json::<_, serde_json::Value>("/api/remove-background", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ToolError::Server {
                status: 503,
                message: "Model warming up".into()
            }
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let c = client("http://127.0.0.1:9");
        let err = c
            .post_json::<_, serde_json::Value>("/api/x", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "NetworkError");
    }

    #[tokio::test]
    async fn get_bytes_strips_content_type_params() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/file.png")
            .with_status(200)
            .with_header("content-type", "image/png; charset=binary")
            .with_body(b"\x89PNG".as_slice())
            .create_async()
            .await;

        let c = client(&server.url());
        let (ct, bytes) = c.get_bytes("/file.png").await.unwrap();
        assert_eq!(ct.as_deref(), Some("image/png"));
        assert_eq!(&bytes[..], b"\x89PNG");
    }
}
