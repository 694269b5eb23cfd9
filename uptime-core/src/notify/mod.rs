//! Alert delivery.
//!
//! Each delivery channel sits behind its own capability trait so the
//! [`Dispatcher`] never depends on a concrete provider. Channels are built
//! once at start-up and only when their credentials are configured.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub mod dispatcher;
pub mod email;
pub mod voice;
pub mod webhook;

pub use dispatcher::{DispatchSummary, Dispatcher};
pub use email::SmtpEmailSender;
pub use voice::TwilioVoiceCaller;
pub use webhook::HttpWebhookSender;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),
    #[error("Invalid configuration for channel: {0}")]
    InvalidConfiguration(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Down,
    Recovered,
}

impl AlertKind {
    /// Status value reported to webhooks.
    pub fn status(&self) -> &'static str {
        match self {
            AlertKind::Down => "down",
            AlertKind::Recovered => "up",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub monitor_name: String,
    pub url: String,
    pub error: Option<String>,
    pub status_code: Option<i32>,
    pub occurred_at: DateTime<Utc>,
}

impl AlertEvent {
    pub fn down(
        monitor_name: impl Into<String>,
        url: impl Into<String>,
        error: Option<String>,
        status_code: Option<i32>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: AlertKind::Down,
            monitor_name: monitor_name.into(),
            url: url.into(),
            error,
            status_code,
            occurred_at,
        }
    }

    pub fn recovered(monitor_name: impl Into<String>, url: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            kind: AlertKind::Recovered,
            monitor_name: monitor_name.into(),
            url: url.into(),
            error: None,
            status_code: None,
            occurred_at,
        }
    }

    /// Human readable failure reason.
    pub fn error_text(&self) -> String {
        match (&self.error, self.status_code) {
            (Some(error), _) => error.clone(),
            (None, Some(code)) => format!("HTTP {}", code),
            (None, None) => "Unknown error".to_string(),
        }
    }

    pub fn email_subject(&self) -> String {
        match self.kind {
            AlertKind::Down => format!("🚨 Alert: {} is DOWN", self.monitor_name),
            AlertKind::Recovered => format!("✅ Recovery: {} is UP", self.monitor_name),
        }
    }

    pub fn email_html(&self) -> String {
        let time = self.occurred_at.format("%Y-%m-%d %H:%M:%S UTC");
        let name = escape_html(&self.monitor_name);
        let url = escape_html(&self.url);

        match self.kind {
            AlertKind::Down => {
                let status = self
                    .status_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "N/A".to_string());
                format!(
                    r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #dc2626;">🚨 Monitor Alert: {name} is DOWN</h2>
  <p><strong>URL:</strong> {url}</p>
  <p><strong>Error:</strong> {error}</p>
  <p><strong>Status Code:</strong> {status}</p>
  <p><strong>Time:</strong> {time}</p>
  <hr style="border: 1px solid #e5e7eb; margin: 20px 0;" />
  <p style="color: #6b7280; font-size: 14px;">This is an automated alert from your Uptime Monitor system.</p>
</div>"#,
                    error = escape_html(&self.error_text()),
                )
            }
            AlertKind::Recovered => format!(
                r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #16a34a;">✅ Monitor Recovered: {name} is UP</h2>
  <p><strong>URL:</strong> {url}</p>
  <p><strong>Time:</strong> {time}</p>
  <hr style="border: 1px solid #e5e7eb; margin: 20px 0;" />
  <p style="color: #6b7280; font-size: 14px;">This is an automated notification from your Uptime Monitor system.</p>
</div>"#
            ),
        }
    }

    pub fn voice_message(&self) -> String {
        match self.kind {
            AlertKind::Down => format!(
                "Alert: Your monitor {} is currently down. Please check your service immediately.",
                self.monitor_name
            ),
            AlertKind::Recovered => format!(
                "Notice: Your monitor {} is now back up and running.",
                self.monitor_name
            ),
        }
    }

    pub fn webhook_payload(&self) -> WebhookPayload {
        WebhookPayload {
            monitor: self.monitor_name.clone(),
            url: self.url.clone(),
            error: match self.kind {
                AlertKind::Down => Some(self.error_text()),
                AlertKind::Recovered => None,
            },
            status_code: self.status_code,
            timestamp: self.occurred_at.to_rfc3339(),
            status: self.kind.status(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub monitor: String,
    pub url: String,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i32>,
    pub timestamp: String,
    pub status: &'static str,
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, to: &str, event: &AlertEvent) -> Result<(), ChannelError>;
}

#[async_trait]
pub trait WebhookSender: Send + Sync {
    async fn send_webhook(&self, url: &str, event: &AlertEvent) -> Result<(), ChannelError>;
}

#[async_trait]
pub trait VoiceCaller: Send + Sync {
    async fn send_voice_call(&self, to: &str, event: &AlertEvent) -> Result<(), ChannelError>;
}
