//! Per-user settings
//!
//! Stored as a JSON document against the user. Every field is optional: an
//! absent value means "use the system default". The engine treats this as an
//! opaque value handed through to the messaging layer, which merges it over
//! its own defaults.

use serde::{Deserialize, Serialize};

use core_kernel::Currency;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub business_name: Option<String>,
    pub reply_to_email: Option<String>,
    pub email_from: Option<String>,
    pub resend_api_key: Option<String>,

    /// One of `groq`, `openai`, `xai`, `gemini`
    pub ai_provider: Option<String>,
    pub groq_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub xai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,

    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_phone_number: Option<String>,
    pub twilio_whatsapp_number: Option<String>,

    pub paystack_secret_key: Option<String>,

    pub prefer_whatsapp: Option<bool>,
    pub default_currency: Option<Currency>,
}
