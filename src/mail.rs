//! Transactional email through the SendGrid v3 API.
//!
//! Not part of the tool pipeline; account flows call it directly.

use crate::client::BackendClient;
use crate::error::ToolError;
use serde::Serialize;
use tracing::info;

pub const DEFAULT_SENDGRID_BASE: &str = "https://api.sendgrid.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub api_key: String,
    /// Sender address.
    pub from: String,
    /// Recipient of admin notifications.
    pub admin: String,
    pub base_url: String,
}

impl MailConfig {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>, admin: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            from: from.into(),
            admin: admin.into(),
            base_url: DEFAULT_SENDGRID_BASE.to_string(),
        }
    }

    /// Read `SENDGRID_API_KEY`, `MAIL_FROM` and `ADMIN_EMAIL`.
    pub fn from_env() -> Result<Self, ToolError> {
        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ToolError::InvalidConfig(format!("{name} is not set")))
        };
        Ok(Self::new(var("SENDGRID_API_KEY")?, var("MAIL_FROM")?, var("ADMIN_EMAIL")?))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[derive(Debug, Clone)]
pub struct Mailer {
    config: MailConfig,
    client: BackendClient,
}

impl Mailer {
    pub fn new(config: MailConfig, client: BackendClient) -> Self {
        Self { config, client }
    }

    pub async fn send_welcome(&self, to: &str, name: &str) -> Result<(), ToolError> {
        let subject = "Welcome to GinyWow!";
        let text = format!(
            "Hi {name},\n\nThanks for signing up. All of our tools are free to use.\n\nThe GinyWow team"
        );
        let html = format!(
            "<p>Hi {},</p><p>Thanks for signing up. All of our tools are free to use.</p><p>The GinyWow team</p>",
            html_escape(name)
        );
        self.send(to, subject, &text, Some(&html)).await
    }

    pub async fn notify_admin(&self, subject: &str, body: &str) -> Result<(), ToolError> {
        let subject = format!("[GinyWow] {subject}");
        self.send(&self.config.admin, &subject, body, None).await
    }

    async fn send(&self, to: &str, subject: &str, text: &str, html: Option<&str>) -> Result<(), ToolError> {
        let mut content = vec![Content {
            kind: "text/plain",
            value: text,
        }];
        if let Some(html) = html {
            content.push(Content {
                kind: "text/html",
                value: html,
            });
        }
        let request = SendRequest {
            personalizations: [Personalization {
                to: [Address { email: to }],
            }],
            from: Address {
                email: &self.config.from,
            },
            subject,
            content,
        };
        let url = format!("{}/v3/mail/send", self.config.base_url);
        let status = self
            .client
            .post_json_authorised(&url, &self.config.api_key, &request)
            .await?;
        info!("Mail '{}' to {} accepted ({})", subject, to, status.as_u16());
        Ok(())
    }
}
