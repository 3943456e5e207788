use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{normalize_phone, ChannelSender, OutboundMessage, SendOutcome};
use crate::error::ChannelError;
use crate::settings::ChannelSettings;

pub const TWILIO_API_URL: &str = "https://api.twilio.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Sms,
    Whatsapp,
}

#[derive(Debug, Default, Deserialize)]
struct TwilioResponse {
    #[serde(default)]
    sid: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// SMS or WhatsApp delivery through Twilio's Messages API
pub struct TwilioSender {
    http: reqwest::Client,
    base_url: String,
    mode: Mode,
}

impl TwilioSender {
    pub fn sms(http: reqwest::Client) -> Self {
        Self::build(http, TWILIO_API_URL, Mode::Sms)
    }

    pub fn whatsapp(http: reqwest::Client) -> Self {
        Self::build(http, TWILIO_API_URL, Mode::Whatsapp)
    }

    pub fn sms_with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self::build(http, base_url, Mode::Sms)
    }

    pub fn whatsapp_with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self::build(http, base_url, Mode::Whatsapp)
    }

    fn build(http: reqwest::Client, base_url: impl Into<String>, mode: Mode) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            mode,
        }
    }

    fn address(&self, number: &str) -> String {
        let number = normalize_phone(number);
        match self.mode {
            Mode::Sms => number,
            Mode::Whatsapp => format!("whatsapp:{}", number),
        }
    }
}

#[async_trait]
impl ChannelSender for TwilioSender {
    async fn send(
        &self,
        destination: &str,
        message: &OutboundMessage,
        settings: &ChannelSettings,
    ) -> Result<SendOutcome, ChannelError> {
        let twilio = &settings.twilio;
        let (Some(sid), Some(token)) = (twilio.account_sid.as_deref(), twilio.auth_token.as_deref()) else {
            return Ok(SendOutcome::failed(
                "Twilio not configured. Please add account SID and auth token.",
            ));
        };

        // WhatsApp falls back to the SMS number when no dedicated one is set
        let from = match self.mode {
            Mode::Sms => twilio.phone_number.as_deref(),
            Mode::Whatsapp => twilio
                .whatsapp_number
                .as_deref()
                .or(twilio.phone_number.as_deref()),
        };
        let Some(from) = from else {
            return Ok(SendOutcome::failed("No Twilio phone number configured."));
        };

        let to = self.address(destination);
        let from = self.address(from);
        let form = [("To", to.as_str()), ("From", from.as_str()), ("Body", message.text.as_str())];

        let response = self
            .http
            .post(format!("{}/2010-04-01/Accounts/{}/Messages.json", self.base_url, sid))
            .basic_auth(sid, Some(token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        // error bodies are not always JSON
        let raw = response.text().await?;
        let body: TwilioResponse = serde_json::from_str(&raw).unwrap_or_default();

        if !status.is_success() {
            let error = body
                .message
                .unwrap_or_else(|| format!("Twilio returned {}", status.as_u16()));
            warn!(mode = ?self.mode, status = status.as_u16(), error = %error, "Message rejected");
            return Ok(SendOutcome::failed(error));
        }

        debug!(mode = ?self.mode, sid = ?body.sid, "Message accepted");
        Ok(SendOutcome::ok(body.sid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whatsapp_address_prefix() {
        let sender = TwilioSender::whatsapp(reqwest::Client::new());
        assert_eq!(sender.address("08031234567"), "whatsapp:+2348031234567");
        let sender = TwilioSender::sms(reqwest::Client::new());
        assert_eq!(sender.address("+15550100"), "+15550100");
    }

    #[tokio::test]
    async fn test_missing_credentials_is_failed_outcome() {
        let sender = TwilioSender::sms(reqwest::Client::new());
        let message = OutboundMessage {
            subject: None,
            text: "hi".into(),
            html: None,
        };
        let outcome = sender
            .send("+15550100", &message, &ChannelSettings::default())
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(
            outcome.error.as_deref(),
            Some("Twilio not configured. Please add account SID and auth token.")
        );
    }
}
