use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ChannelSender, OutboundMessage, SendOutcome};
use crate::error::ChannelError;
use crate::settings::ChannelSettings;

pub const RESEND_API_URL: &str = "https://api.resend.com";

#[derive(Debug, Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
struct ResendResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Email delivery through the Resend API
pub struct ResendEmailSender {
    http: reqwest::Client,
    base_url: String,
}

impl ResendEmailSender {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, RESEND_API_URL)
    }

    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ChannelSender for ResendEmailSender {
    async fn send(
        &self,
        destination: &str,
        message: &OutboundMessage,
        settings: &ChannelSettings,
    ) -> Result<SendOutcome, ChannelError> {
        let Some(api_key) = settings.resend_api_key.as_deref() else {
            return Ok(SendOutcome::failed(
                "Email provider not configured. Please add a Resend API key.",
            ));
        };

        let request = ResendRequest {
            from: &settings.email_from,
            to: [destination],
            subject: message.subject.as_deref().unwrap_or("Invoice reminder"),
            html: message.html.as_deref(),
            text: &message.text,
            reply_to: settings.reply_to.as_deref(),
        };

        let response = self
            .http
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        // error bodies are not always JSON
        let raw = response.text().await?;
        let body: ResendResponse = serde_json::from_str(&raw).unwrap_or_default();

        if !status.is_success() {
            let error = body
                .message
                .unwrap_or_else(|| format!("Email provider returned {}", status.as_u16()));
            warn!(status = status.as_u16(), error = %error, "Email rejected");
            return Ok(SendOutcome::failed(error));
        }

        debug!(message_id = ?body.id, "Email accepted");
        Ok(SendOutcome::ok(body.id))
    }
}
