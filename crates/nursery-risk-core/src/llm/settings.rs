use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use super::ProviderKind;
use crate::error::AssessmentError;

/// Output budget for one assessment request.
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
/// Request timeout when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Resolved configuration for the language-model client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmSettings {
    pub provider: ProviderKind,
    pub api_key: String,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub fixture_path: Option<PathBuf>,
}

/// Values read from the `[llm]` table of a configuration file.
///
/// Every field is optional; environment variables take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LlmFileConfig {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub api_key_file: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub timeout: Option<String>,
    pub max_tokens: Option<u32>,
    pub fixture: Option<PathBuf>,
}

impl LlmSettings {
    const PROVIDER_ENV: &'static str = "NURSERY_RISK_PROVIDER";
    const API_KEY_ENV: &'static str = "NURSERY_RISK_API_KEY";
    const API_KEY_FILE_ENV: &'static str = "NURSERY_RISK_API_KEY_FILE";
    const ENDPOINT_ENV: &'static str = "NURSERY_RISK_ENDPOINT";
    const MODEL_ENV: &'static str = "NURSERY_RISK_MODEL";
    const TIMEOUT_ENV: &'static str = "NURSERY_RISK_TIMEOUT";
    const MAX_TOKENS_ENV: &'static str = "NURSERY_RISK_MAX_TOKENS";
    const FIXTURE_ENV: &'static str = "NURSERY_RISK_FIXTURE";

    /// Load settings from environment variables.
    ///
    /// * `NURSERY_RISK_PROVIDER` — `anthropic` (default), `openai`, `gemini` or `fixture`.
    /// * `NURSERY_RISK_API_KEY` — API key, or `NURSERY_RISK_API_KEY_FILE` pointing at a file holding it.
    /// * `NURSERY_RISK_TIMEOUT` — seconds (`45`) or a humantime duration (`90s`, `2m`).
    pub fn from_env() -> Result<Self, AssessmentError> {
        Self::from_sources(std::env::vars().collect(), LlmFileConfig::default())
    }

    /// Merge a configuration file section with environment variables.
    pub fn from_env_and_file(file: LlmFileConfig) -> Result<Self, AssessmentError> {
        Self::from_sources(std::env::vars().collect(), file)
    }

    pub(crate) fn from_sources(
        vars: HashMap<String, String>,
        file: LlmFileConfig,
    ) -> Result<Self, AssessmentError> {
        let env = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider = env(Self::PROVIDER_ENV)
            .or(file.provider)
            .map(|value| value.parse::<ProviderKind>())
            .transpose()?
            .unwrap_or(ProviderKind::Anthropic);

        let key_file = env(Self::API_KEY_FILE_ENV)
            .map(PathBuf::from)
            .or(file.api_key_file);
        let api_key = match env(Self::API_KEY_ENV).or(file.api_key) {
            Some(key) => key,
            None => match key_file {
                Some(path) => fs::read_to_string(&path)
                    .map_err(|err| {
                        AssessmentError::Configuration(format!(
                            "failed to read API key file {}: {err}",
                            path.display()
                        ))
                    })?
                    .trim()
                    .to_string(),
                None => String::new(),
            },
        };
        if provider.requires_api_key() && api_key.trim().is_empty() {
            return Err(AssessmentError::Configuration(format!(
                "an API key for provider `{provider}` must be set via {} or {}",
                Self::API_KEY_ENV,
                Self::API_KEY_FILE_ENV
            )));
        }

        let timeout_secs = match env(Self::TIMEOUT_ENV).or(file.timeout) {
            Some(raw) => parse_timeout(&raw)?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let max_tokens = match env(Self::MAX_TOKENS_ENV) {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                AssessmentError::Configuration(format!(
                    "{} must be a positive integer (got `{raw}`)",
                    Self::MAX_TOKENS_ENV
                ))
            })?,
            None => file.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        };
        if max_tokens == 0 {
            return Err(AssessmentError::Configuration(
                "max_tokens must be greater than zero".into(),
            ));
        }

        let fixture_path = env(Self::FIXTURE_ENV).map(PathBuf::from).or(file.fixture);
        if provider == ProviderKind::Fixture && fixture_path.is_none() {
            return Err(AssessmentError::Configuration(format!(
                "the fixture provider needs {} or `llm.fixture` to name a response file",
                Self::FIXTURE_ENV
            )));
        }

        Ok(Self {
            provider,
            api_key,
            endpoint: env(Self::ENDPOINT_ENV).or(file.endpoint.filter(|v| !v.trim().is_empty())),
            model: env(Self::MODEL_ENV).or(file.model.filter(|v| !v.trim().is_empty())),
            timeout_secs,
            max_tokens,
            fixture_path,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Whole seconds or a humantime duration; sub-second durations round up to one second.
fn parse_timeout(raw: &str) -> Result<u64, AssessmentError> {
    let raw = raw.trim();
    let duration = match raw.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => humantime::parse_duration(raw).map_err(|err| {
            AssessmentError::Configuration(format!("invalid timeout `{raw}`: {err}"))
        })?,
    };
    if duration.is_zero() {
        return Err(AssessmentError::Configuration(format!(
            "timeout must be greater than zero (got `{raw}`)"
        )));
    }
    Ok(duration.as_secs().max(1))
}
