//! Channel settings
//!
//! [`ChannelSettings`] is the resolved configuration a reminder is composed
//! and delivered with. The system defaults come from the process
//! configuration; each user's [`UserSettings`] are laid over them with the
//! pure [`ChannelSettings::merged_with`]. The result is an immutable value
//! handed to the composer and the senders for one reminder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use domain_billing::UserSettings;

pub const DEFAULT_EMAIL_FROM: &str = "Accounts Receivable <billing@example.com>";

/// Supported AI providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProviderKind {
    Groq,
    OpenAi,
    Xai,
    Gemini,
}

impl AiProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiProviderKind::Groq => "groq",
            AiProviderKind::OpenAi => "openai",
            AiProviderKind::Xai => "xai",
            AiProviderKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for AiProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(AiProviderKind::Groq),
            "openai" => Ok(AiProviderKind::OpenAi),
            "xai" => Ok(AiProviderKind::Xai),
            "gemini" => Ok(AiProviderKind::Gemini),
            other => Err(format!("unknown AI provider '{}'", other)),
        }
    }
}

/// AI provider keys and preference
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    pub provider: Option<AiProviderKind>,
    pub groq_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub xai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

/// A provider and the key to call it with
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSelection {
    pub kind: AiProviderKind,
    pub api_key: String,
}

impl fmt::Debug for ProviderSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSelection")
            .field("kind", &self.kind)
            .field("api_key", &"***")
            .finish()
    }
}

impl AiSettings {
    /// Picks the provider to use, if any key is available for it
    ///
    /// Groq is the default. A Groq key that is really an xAI key (prefix
    /// `xai-`) switches the provider to xAI.
    pub fn selection(&self) -> Option<ProviderSelection> {
        let mut kind = self.provider.unwrap_or(AiProviderKind::Groq);
        if kind == AiProviderKind::Groq
            && self
                .groq_api_key
                .as_deref()
                .is_some_and(|k| k.starts_with("xai-"))
        {
            kind = AiProviderKind::Xai;
        }

        let api_key = match kind {
            AiProviderKind::Groq => self.groq_api_key.clone(),
            AiProviderKind::OpenAi => self.openai_api_key.clone(),
            AiProviderKind::Xai => self.xai_api_key.clone().or_else(|| self.groq_api_key.clone()),
            AiProviderKind::Gemini => self.gemini_api_key.clone(),
        }?;

        Some(ProviderSelection { kind, api_key })
    }
}

impl fmt::Debug for AiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiSettings")
            .field("provider", &self.provider)
            .field("groq_api_key", &self.groq_api_key.as_ref().map(|_| "***"))
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "***"))
            .field("xai_api_key", &self.xai_api_key.as_ref().map(|_| "***"))
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Twilio credentials and sender numbers
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwilioSettings {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub phone_number: Option<String>,
    pub whatsapp_number: Option<String>,
}

impl fmt::Debug for TwilioSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioSettings")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "***"))
            .field("phone_number", &self.phone_number)
            .field("whatsapp_number", &self.whatsapp_number)
            .finish()
    }
}

/// Fully resolved settings for composing and delivering one reminder
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    pub business_name: Option<String>,
    pub reply_to: Option<String>,
    pub email_from: String,
    pub resend_api_key: Option<String>,
    pub ai: AiSettings,
    pub twilio: TwilioSettings,
    pub paystack_secret_key: Option<String>,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            business_name: None,
            reply_to: None,
            email_from: DEFAULT_EMAIL_FROM.to_string(),
            resend_api_key: None,
            ai: AiSettings::default(),
            twilio: TwilioSettings::default(),
            paystack_secret_key: None,
        }
    }
}

impl fmt::Debug for ChannelSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSettings")
            .field("business_name", &self.business_name)
            .field("reply_to", &self.reply_to)
            .field("email_from", &self.email_from)
            .field("resend_api_key", &self.resend_api_key.as_ref().map(|_| "***"))
            .field("ai", &self.ai)
            .field("twilio", &self.twilio)
            .field("paystack_secret_key", &self.paystack_secret_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// A user value wins when it is present and not blank
fn pick(user: &Option<String>, default: &Option<String>) -> Option<String> {
    match user.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => default.clone(),
    }
}

impl ChannelSettings {
    /// Lays a user's partial overrides over these defaults
    ///
    /// Pure: neither input is modified. Blank strings count as absent, and
    /// an unrecognised provider name keeps the default provider.
    pub fn merged_with(&self, user: &UserSettings) -> ChannelSettings {
        let provider = user
            .ai_provider
            .as_deref()
            .and_then(|p| p.parse::<AiProviderKind>().ok())
            .or(self.ai.provider);

        ChannelSettings {
            business_name: pick(&user.business_name, &self.business_name),
            reply_to: pick(&user.reply_to_email, &self.reply_to),
            email_from: pick(&user.email_from, &Some(self.email_from.clone()))
                .unwrap_or_else(|| self.email_from.clone()),
            resend_api_key: pick(&user.resend_api_key, &self.resend_api_key),
            ai: AiSettings {
                provider,
                groq_api_key: pick(&user.groq_api_key, &self.ai.groq_api_key),
                openai_api_key: pick(&user.openai_api_key, &self.ai.openai_api_key),
                xai_api_key: pick(&user.xai_api_key, &self.ai.xai_api_key),
                gemini_api_key: pick(&user.gemini_api_key, &self.ai.gemini_api_key),
            },
            twilio: TwilioSettings {
                account_sid: pick(&user.twilio_account_sid, &self.twilio.account_sid),
                auth_token: pick(&user.twilio_auth_token, &self.twilio.auth_token),
                phone_number: pick(&user.twilio_phone_number, &self.twilio.phone_number),
                whatsapp_number: pick(&user.twilio_whatsapp_number, &self.twilio.whatsapp_number),
            },
            paystack_secret_key: pick(&user.paystack_secret_key, &self.paystack_secret_key),
        }
    }
}
