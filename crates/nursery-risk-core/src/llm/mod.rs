mod anthropic;
mod fixture;
mod gemini;
mod openai;
mod settings;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::AssessmentError;

pub use anthropic::AnthropicClient;
pub use fixture::FixtureLlmClient;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use settings::{LlmFileConfig, LlmSettings, DEFAULT_MAX_TOKENS, DEFAULT_TIMEOUT_SECS};

/// One prompt sent to a language model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
}

/// Client abstraction over a text-completion provider: prompt in, text out.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send exactly one request and return the raw text of the reply.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Supported language-model backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
    Gemini,
    Fixture,
}

impl ProviderKind {
    pub fn requires_api_key(self) -> bool {
        !matches!(self, Self::Fixture)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Fixture => "fixture",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = AssessmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAi),
            "gemini" | "google" => Ok(Self::Gemini),
            "fixture" => Ok(Self::Fixture),
            other => Err(AssessmentError::Configuration(format!(
                "unknown provider `{other}` (expected anthropic, openai, gemini or fixture)"
            ))),
        }
    }
}

/// Construct the client named by `settings.provider`.
pub fn build_client(settings: &LlmSettings) -> Result<Arc<dyn LlmClient>, AssessmentError> {
    let client: Arc<dyn LlmClient> = match settings.provider {
        ProviderKind::Anthropic => Arc::new(AnthropicClient::new(settings)?),
        ProviderKind::OpenAi => Arc::new(OpenAiClient::new(settings)?),
        ProviderKind::Gemini => Arc::new(GeminiClient::new(settings)?),
        ProviderKind::Fixture => Arc::new(FixtureLlmClient::from_settings(settings)?),
    };
    Ok(client)
}

pub(crate) fn require_api_key(settings: &LlmSettings, provider: &str) -> Result<(), AssessmentError> {
    if settings.api_key.trim().is_empty() {
        return Err(AssessmentError::Configuration(format!(
            "{provider} API key must be provided via NURSERY_RISK_API_KEY"
        )));
    }
    Ok(())
}

pub(crate) fn build_http(settings: &LlmSettings) -> Result<reqwest::Client, AssessmentError> {
    reqwest::Client::builder()
        .user_agent(concat!("nursery-risk/", env!("CARGO_PKG_VERSION")))
        .timeout(settings.timeout())
        .build()
        .map_err(|err| AssessmentError::Configuration(format!("failed to build HTTP client: {err}")))
}
