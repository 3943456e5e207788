use std::sync::Arc;
use std::time::Duration;

use crate::settings::{AiProviderKind, AiSettings};

use super::gemini::GEMINI_BASE_URL;
use super::openai_compat::{
    GROQ_BASE_URL, GROQ_MODEL, OPENAI_BASE_URL, OPENAI_MODEL, XAI_BASE_URL, XAI_MODEL,
};
use super::{ContentGenerator, GeminiProvider, OpenAiCompatibleProvider};

/// Builds a generator for the provider the settings select
pub trait GeneratorFactory: Send + Sync {
    /// `None` when no provider key is configured
    fn for_settings(&self, settings: &AiSettings) -> Option<Arc<dyn ContentGenerator>>;
}

/// Provider base URLs, overridable for tests and proxies
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub groq: String,
    pub openai: String,
    pub xai: String,
    pub gemini: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            groq: GROQ_BASE_URL.to_string(),
            openai: OPENAI_BASE_URL.to_string(),
            xai: XAI_BASE_URL.to_string(),
            gemini: GEMINI_BASE_URL.to_string(),
        }
    }
}

/// Factory backed by a shared HTTP client
#[derive(Clone)]
pub struct HttpGeneratorFactory {
    http: reqwest::Client,
    endpoints: ProviderEndpoints,
}

impl HttpGeneratorFactory {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, ProviderEndpoints::default()))
    }

    pub fn with_client(http: reqwest::Client, endpoints: ProviderEndpoints) -> Self {
        Self { http, endpoints }
    }
}

impl GeneratorFactory for HttpGeneratorFactory {
    fn for_settings(&self, settings: &AiSettings) -> Option<Arc<dyn ContentGenerator>> {
        let selection = settings.selection()?;
        let http = self.http.clone();
        let key = selection.api_key;

        let generator: Arc<dyn ContentGenerator> = match selection.kind {
            AiProviderKind::Groq => Arc::new(OpenAiCompatibleProvider::with_base_url(
                http, "groq", &self.endpoints.groq, GROQ_MODEL, key,
            )),
            AiProviderKind::OpenAi => Arc::new(OpenAiCompatibleProvider::with_base_url(
                http, "openai", &self.endpoints.openai, OPENAI_MODEL, key,
            )),
            AiProviderKind::Xai => Arc::new(OpenAiCompatibleProvider::with_base_url(
                http, "xai", &self.endpoints.xai, XAI_MODEL, key,
            )),
            AiProviderKind::Gemini => Arc::new(GeminiProvider::with_base_url(http, &self.endpoints.gemini, key)),
        };
        Some(generator)
    }
}
