use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{CompletionRequest, LlmClient, LlmSettings};
use crate::error::AssessmentError;

/// Replays a model response saved on disk instead of calling a provider.
#[derive(Debug, Clone)]
pub struct FixtureLlmClient {
    path: PathBuf,
}

impl FixtureLlmClient {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_settings(settings: &LlmSettings) -> Result<Self, AssessmentError> {
        settings
            .fixture_path
            .as_deref()
            .map(Self::new)
            .ok_or_else(|| {
                AssessmentError::Configuration(
                    "fixture provider requires a response file path".into(),
                )
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LlmClient for FixtureLlmClient {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read fixture response {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "system".into(),
            prompt: "prompt".into(),
            max_tokens: 10,
        }
    }

    #[tokio::test]
    async fn replays_file_contents() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "{\"hazards\": []}").unwrap();
        let client = FixtureLlmClient::new(file.path());
        assert_eq!(client.complete(&request()).await.unwrap(), "{\"hazards\": []}");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let client = FixtureLlmClient::new("/nonexistent/nursery-risk/response.json");
        let err = client.complete(&request()).await.unwrap_err();
        assert!(err.to_string().contains("failed to read fixture response"));
    }
}
