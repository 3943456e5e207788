//! AI-personalised reminder content
//!
//! Each provider implements [`ContentGenerator`]. The
//! [`GeneratorFactory`] turns resolved AI settings into a generator, or into
//! nothing when no provider key is available. Generation may fail in many
//! ways; the composer treats every failure the same as having no AI at all.

mod factory;
mod gemini;
mod openai_compat;
mod parse;
mod prompt;

pub use factory::{GeneratorFactory, HttpGeneratorFactory, ProviderEndpoints};
pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatibleProvider;
pub use parse::parse_generated;
pub use prompt::{build_prompt, history_summary, SYSTEM_PROMPT};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use domain_billing::EscalationLevel;

use crate::error::AiError;

/// Facts handed to a provider for one reminder
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderContext {
    pub invoice_number: String,
    /// Already formatted for the invoice currency
    pub amount: String,
    pub due_date: String,
    pub description: Option<String>,
    pub client_name: String,
    pub history_summary: String,
    pub level: EscalationLevel,
}

/// Structured content returned by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedReminder {
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub suggested_action: Option<String>,
}

/// A provider that writes reminder content
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    async fn generate(&self, context: &ReminderContext) -> Result<GeneratedReminder, AiError>;
}
