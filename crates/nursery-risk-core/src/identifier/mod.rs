//! Turns an activity description into a [`RiskAssessment`] with one model call.

mod parse;
mod prompt;

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{debug, info, warn};

use crate::error::{AssessmentError, ValidationError};
use crate::llm::{build_client, CompletionRequest, LlmClient, LlmSettings, DEFAULT_MAX_TOKENS};
use crate::model::{AgeGroup, RiskAssessment, DEFAULT_LOCATION};

pub use parse::{parse_model_output, strip_code_fence, ParsedAssessment};

/// Caller-supplied description of the activity to assess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRequest {
    pub activity_name: String,
    pub activity_description: String,
    pub location: Option<String>,
    pub age_groups: Vec<AgeGroup>,
}

impl ActivityRequest {
    pub fn new(activity_name: impl Into<String>, activity_description: impl Into<String>) -> Self {
        Self {
            activity_name: activity_name.into(),
            activity_description: activity_description.into(),
            location: None,
            age_groups: Vec::new(),
        }
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn age_groups(mut self, age_groups: impl IntoIterator<Item = AgeGroup>) -> Self {
        self.age_groups = age_groups.into_iter().collect();
        self
    }
}

/// Builds prompts, calls the language model once and maps the reply into a typed assessment.
///
/// Holds no mutable state, so one instance can serve concurrent callers.
#[derive(Clone)]
pub struct HazardIdentifier {
    client: Arc<dyn LlmClient>,
    max_tokens: u32,
}

impl HazardIdentifier {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Build the provider client named in `settings`.
    ///
    /// Fails with [`AssessmentError::Configuration`] when the credential is missing.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, AssessmentError> {
        Ok(Self::new(build_client(settings)?).with_max_tokens(settings.max_tokens))
    }

    /// Override the output budget; zero leaves the current budget in place.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        if max_tokens > 0 {
            self.max_tokens = max_tokens;
        }
        self
    }

    /// Identify hazards for an activity; either a complete assessment or an error.
    pub async fn identify_hazards(
        &self,
        request: &ActivityRequest,
    ) -> Result<RiskAssessment, AssessmentError> {
        let activity_name = non_empty(&request.activity_name, "activity_name")?;
        let activity_description = non_empty(&request.activity_description, "activity_description")?;
        let location = request
            .location
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_LOCATION);
        let age_groups = if request.age_groups.is_empty() {
            vec![AgeGroup::AllAges]
        } else {
            request.age_groups.clone()
        };

        let completion = CompletionRequest {
            system: prompt::SYSTEM_PROMPT.to_string(),
            prompt: prompt::user_prompt(activity_name, activity_description, location, &age_groups),
            max_tokens: self.max_tokens,
        };
        info!(activity = activity_name, location, "requesting hazard identification");
        debug!(
            prompt_chars = completion.prompt.chars().count(),
            max_tokens = completion.max_tokens,
            "sending completion request"
        );

        let raw = self
            .client
            .complete(&completion)
            .await
            .map_err(AssessmentError::Provider)?;
        debug!(response_chars = raw.chars().count(), "received model output");

        let parsed = parse_model_output(&raw).map_err(|err| {
            warn!(error = %err, "model output could not be interpreted");
            err
        })?;

        let assessment = RiskAssessment::new(
            activity_name,
            activity_description,
            location,
            age_groups,
            parsed.hazards,
            today(),
            parsed.additional_notes,
        );
        info!(
            hazards = assessment.hazards().len(),
            overall = %assessment.overall_risk_level(),
            "risk assessment ready"
        );
        Ok(assessment)
    }
}

fn non_empty<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyInput { field });
    }
    Ok(trimmed)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
