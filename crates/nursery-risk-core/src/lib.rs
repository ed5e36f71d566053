pub mod error;
pub mod identifier;
pub mod llm;
pub mod model;
pub mod report;

pub use error::{AssessmentError, ValidationError};
pub use identifier::{ActivityRequest, HazardIdentifier};
pub use llm::{build_client, LlmClient, LlmFileConfig, LlmSettings, ProviderKind};
pub use model::{
    risk_level, AgeGroup, Hazard, HazardWithMitigation, Likelihood, MitigationStrategy,
    RiskAssessment, RiskLevel, Severity,
};
pub use report::{render_assessment, OutputFormat};
