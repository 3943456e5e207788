//! Providers speaking the OpenAI chat-completions protocol
//!
//! Groq, OpenAI and xAI expose the same `POST {base}/chat/completions`
//! endpoint, so one client covers all three with a different base URL and
//! model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{parse_generated, build_prompt, ContentGenerator, GeneratedReminder, ReminderContext, SYSTEM_PROMPT};
use crate::error::AiError;

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const XAI_BASE_URL: &str = "https://api.x.ai/v1";

pub(crate) const GROQ_MODEL: &str = "llama-3.3-70b-versatile";
pub(crate) const OPENAI_MODEL: &str = "gpt-4o-mini";
pub(crate) const XAI_MODEL: &str = "grok-2-latest";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client for one provider
pub struct OpenAiCompatibleProvider {
    http: reqwest::Client,
    name: &'static str,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiCompatibleProvider {
    pub fn groq(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self::with_base_url(http, "groq", GROQ_BASE_URL, GROQ_MODEL, api_key)
    }

    pub fn openai(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self::with_base_url(http, "openai", OPENAI_BASE_URL, OPENAI_MODEL, api_key)
    }

    pub fn xai(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self::with_base_url(http, "xai", XAI_BASE_URL, XAI_MODEL, api_key)
    }

    pub fn with_base_url(
        http: reqwest::Client,
        name: &'static str,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            name,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ContentGenerator for OpenAiCompatibleProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn generate(&self, context: &ReminderContext) -> Result<GeneratedReminder, AiError> {
        if self.api_key.trim().is_empty() {
            return Err(AiError::MissingKey(self.name));
        }

        let prompt = build_prompt(context);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &prompt },
            ],
            temperature: 0.7,
            max_tokens: 500,
        };

        debug!(provider = self.name, model = %self.model, invoice = %context.invoice_number, "Requesting reminder content");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api { status: status.as_u16(), body });
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(AiError::EmptyResponse)?;

        parse_generated(&content)
    }
}
