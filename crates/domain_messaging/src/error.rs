//! Messaging errors

use thiserror::Error;

/// Errors raised while generating reminder content with an AI provider
///
/// None of these reach the caller of the composer; they trigger the
/// template fallback and are logged.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("No API key configured for {0}")]
    MissingKey(&'static str),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Provider returned an empty response")]
    EmptyResponse,

    #[error("Could not parse provider response: {0}")]
    Parse(String),
}

/// Errors raised by a channel sender before or while talking to the
/// provider
///
/// A provider that answers with a rejection is not an error: senders report
/// it as an unsuccessful [`crate::channels::SendOutcome`].
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Could not parse provider response: {0}")]
    Parse(String),

    #[error("No sender registered for channel {0}")]
    Unsupported(String),
}

/// Errors from the payment-link provider
#[derive(Debug, Error)]
pub enum PaymentLinkError {
    #[error("Payment provider not configured")]
    NotConfigured,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned {status}: {message}")]
    Api { status: u16, message: String },
}

impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AiError::Parse(e.to_string())
        } else {
            AiError::Network(e.to_string())
        }
    }
}

impl From<reqwest::Error> for ChannelError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ChannelError::Parse(e.to_string())
        } else {
            ChannelError::Network(e.to_string())
        }
    }
}

impl From<reqwest::Error> for PaymentLinkError {
    fn from(e: reqwest::Error) -> Self {
        PaymentLinkError::Network(e.to_string())
    }
}
