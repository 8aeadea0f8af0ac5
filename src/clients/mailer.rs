//! Outbound mail delivery
//!
//! Fire-and-forget per recipient: the core never retries, a failed send
//! simply leaves the target pending.

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail provider rejected the message: {0}")]
    Provider(String),

    #[error("mail provider unreachable: {0}")]
    Network(#[from] reqwest::Error),
}

/// One message handed to the provider.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    /// Display form, e.g. `Kinetis Security <security@kinetis.org>`
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Send seam used by campaign dispatch and quick attacks.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}

/// Production mailer backed by the Resend HTTP API.
#[derive(Clone)]
pub struct ResendMailer {
    http: reqwest::Client,
    api_key: String,
}

impl ResendMailer {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self { http, api_key }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let response = self
            .http
            .post(RESEND_API_URL)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": email.from,
                "to": [email.to],
                "subject": email.subject,
                "html": email.html,
            }))
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(MailError::Provider(format!("{}: {}", status, body)))
    }
}

/// Development mailer: logs the message instead of delivering it.
/// Used when no provider key is configured.
#[derive(Clone, Default)]
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "mail provider not configured, logging send instead"
        );
        Ok(())
    }
}
