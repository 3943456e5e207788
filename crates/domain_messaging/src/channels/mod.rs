//! Delivery channels
//!
//! A [`ChannelSender`] delivers one message to one destination. Providers
//! that reject a message produce an unsuccessful [`SendOutcome`]; a
//! [`ChannelError`] means the provider could not be reached or understood.

mod email;
mod twilio;

pub use email::{ResendEmailSender, RESEND_API_URL};
pub use twilio::{TwilioSender, TWILIO_API_URL};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use domain_billing::Channel;

use crate::error::ChannelError;
use crate::settings::ChannelSettings;

/// Message content handed to a sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub subject: Option<String>,
    pub text: String,
    pub html: Option<String>,
}

/// Result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub message_id: Option<String>,
}

impl SendOutcome {
    pub fn ok(message_id: Option<String>) -> Self {
        Self {
            success: true,
            error: None,
            message_id,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            message_id: None,
        }
    }
}

#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send(
        &self,
        destination: &str,
        message: &OutboundMessage,
        settings: &ChannelSettings,
    ) -> Result<SendOutcome, ChannelError>;
}

/// Normalizes a phone number to E.164-ish form
///
/// Whitespace is removed. A leading `0` is a Nigerian local number and
/// becomes `+234`; anything else gets a leading `+` if it lacks one.
pub fn normalize_phone(raw: &str) -> String {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if let Some(rest) = compact.strip_prefix('0') {
        format!("+234{}", rest)
    } else if compact.starts_with('+') {
        compact
    } else {
        format!("+{}", compact)
    }
}

/// Routes messages to the sender registered for a channel
#[derive(Clone, Default)]
pub struct ChannelDispatcher {
    senders: HashMap<Channel, Arc<dyn ChannelSender>>,
}

impl ChannelDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sender(mut self, channel: Channel, sender: Arc<dyn ChannelSender>) -> Self {
        self.senders.insert(channel, sender);
        self
    }

    /// Resend for email, Twilio for SMS and WhatsApp
    pub fn http(http: reqwest::Client) -> Self {
        Self::new()
            .with_sender(Channel::Email, Arc::new(ResendEmailSender::new(http.clone())))
            .with_sender(Channel::Sms, Arc::new(TwilioSender::sms(http.clone())))
            .with_sender(Channel::Whatsapp, Arc::new(TwilioSender::whatsapp(http)))
    }

    pub async fn send(
        &self,
        channel: Channel,
        destination: &str,
        message: &OutboundMessage,
        settings: &ChannelSettings,
    ) -> Result<SendOutcome, ChannelError> {
        let sender = self
            .senders
            .get(&channel)
            .ok_or_else(|| ChannelError::Unsupported(channel.to_string()))?;
        sender.send(destination, message, settings).await
    }
}
