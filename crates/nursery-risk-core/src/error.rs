use thiserror::Error;

/// Failure modes of a single hazard-identification call. None of them is retried.
#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("language model provider request failed: {0:#}")]
    Provider(#[source] anyhow::Error),
    #[error("could not interpret model output as JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("model output failed validation: {0}")]
    Validation(#[from] ValidationError),
}

impl AssessmentError {
    /// Short message suitable for showing to the person who asked for the assessment.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "The assessment service is not configured correctly.",
            Self::Provider(_) => "The language model could not be reached. Please try again later.",
            Self::Parse(_) | Self::Validation(_) => {
                "The language model returned an assessment that could not be interpreted."
            }
        }
    }
}

/// Structural problems in caller input or in the model's JSON.
///
/// `location` names where the problem sits, e.g. `hazards[1].additional_controls[0]`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("`{field}` must not be empty")]
    EmptyInput { field: &'static str },
    #[error("missing required field `{field}` in {location}")]
    MissingField { location: String, field: String },
    #[error("field `{field}` in {location} must be {expected}")]
    InvalidType {
        location: String,
        field: String,
        expected: &'static str,
    },
    #[error("invalid value `{value}` for field `{field}` in {location} (expected one of: {allowed})")]
    InvalidEnumValue {
        location: String,
        field: String,
        value: String,
        allowed: &'static str,
    },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            Self::EmptyInput { field } => field,
            Self::MissingField { field, .. }
            | Self::InvalidType { field, .. }
            | Self::InvalidEnumValue { field, .. } => field,
        }
    }
}
