use std::fmt::Write;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{
    AgeGroup, HazardWithMitigation, Likelihood, MitigationStrategy, RiskAssessment, RiskLevel,
    Severity,
};

/// Output styles supported by [`render_assessment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Markdown,
    Json,
    Yaml,
}

impl OutputFormat {
    /// File extension used when saving a document in this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Markdown => "md",
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(format!(
                "unknown format `{other}` (expected text, markdown, json or yaml)"
            )),
        }
    }
}

/// Produce a document from a `RiskAssessment` using the desired format.
pub fn render_assessment(assessment: &RiskAssessment, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => render_text(assessment),
        OutputFormat::Markdown => render_markdown(assessment),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&AssessmentDocument::from(assessment))?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(&AssessmentDocument::from(assessment))?),
    }
}

fn render_text(assessment: &RiskAssessment) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(out, "Risk Assessment: {}", assessment.activity_name())?;
    writeln!(out, "Overall Risk: {}", assessment.overall_risk_level())?;
    writeln!(out, "Location: {}", assessment.location())?;
    writeln!(out, "Age Groups: {}", join_ages(assessment.age_groups()))?;
    writeln!(out, "Date: {}", format_date(assessment.assessment_date()))?;
    if let Some(assessor) = assessment.assessor_name() {
        writeln!(out, "Assessor: {assessor}")?;
    }
    if let Some(review) = assessment.review_date() {
        writeln!(out, "Review By: {}", format_date(review))?;
    }
    writeln!(out)?;

    if assessment.hazards().is_empty() {
        writeln!(out, "No hazards identified.")?;
    } else {
        writeln!(out, "Hazards:")?;
        for (idx, entry) in assessment.hazards().iter().enumerate() {
            let hazard = &entry.hazard;
            writeln!(
                out,
                "  {n}. {desc} [{level}] severity {sev}, likelihood {lik}, residual {res}",
                n = idx + 1,
                desc = single_line(&hazard.description),
                level = hazard.risk_level(),
                sev = hazard.severity,
                lik = hazard.likelihood,
                res = entry.residual_risk,
            )?;
            writeln!(out, "     At risk: {}", single_line(&hazard.who_at_risk))?;
            for control in &entry.existing_controls {
                writeln!(out, "     - {}", single_line(control))?;
            }
            for control in &entry.additional_controls {
                writeln!(
                    out,
                    "     + {} ({})",
                    single_line(&control.action),
                    control.responsible_person
                )?;
            }
        }
    }

    if !assessment.additional_notes().trim().is_empty() {
        writeln!(out, "\nNotes: {}", assessment.additional_notes().trim())?;
    }
    Ok(out)
}

fn render_markdown(assessment: &RiskAssessment) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(out, "# Risk Assessment: {}", escape_cell(assessment.activity_name()))?;
    writeln!(out)?;
    writeln!(out, "| | |")?;
    writeln!(out, "|---|---|")?;
    writeln!(out, "| **Activity** | {} |", escape_cell(assessment.activity_name()))?;
    writeln!(out, "| **Description** | {} |", escape_cell(assessment.activity_description()))?;
    writeln!(out, "| **Location** | {} |", escape_cell(assessment.location()))?;
    writeln!(out, "| **Age groups** | {} |", join_ages(assessment.age_groups()))?;
    writeln!(out, "| **Assessment date** | {} |", format_date(assessment.assessment_date()))?;
    writeln!(
        out,
        "| **Assessor** | {} |",
        assessment.assessor_name().map(escape_cell).unwrap_or_default()
    )?;
    writeln!(
        out,
        "| **Review date** | {} |",
        assessment.review_date().map(format_date).unwrap_or_default()
    )?;
    writeln!(out, "| **Overall risk** | **{}** |", assessment.overall_risk_level())?;
    writeln!(out)?;

    writeln!(out, "## Hazards")?;
    writeln!(out)?;
    if assessment.hazards().is_empty() {
        writeln!(out, "No hazards identified.")?;
    } else {
        writeln!(out, "| # | Hazard | Who is at risk | Severity | Likelihood | Risk |")?;
        writeln!(out, "|---|---|---|---|---|---|")?;
        for (idx, entry) in assessment.hazards().iter().enumerate() {
            let hazard = &entry.hazard;
            writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} |",
                idx + 1,
                escape_cell(&hazard.description),
                escape_cell(&hazard.who_at_risk),
                hazard.severity,
                hazard.likelihood,
                hazard.risk_level()
            )?;
        }
        for (idx, entry) in assessment.hazards().iter().enumerate() {
            writeln!(out)?;
            writeln!(out, "### {}. {}", idx + 1, single_line(&entry.hazard.description))?;
            writeln!(out)?;
            writeln!(out, "**Existing controls**")?;
            writeln!(out)?;
            if entry.existing_controls.is_empty() {
                writeln!(out, "- None recorded")?;
            }
            for control in &entry.existing_controls {
                writeln!(out, "- {}", single_line(control))?;
            }
            writeln!(out)?;
            writeln!(out, "**Additional controls**")?;
            writeln!(out)?;
            if entry.additional_controls.is_empty() {
                writeln!(out, "- None required")?;
            }
            for control in &entry.additional_controls {
                writeln!(
                    out,
                    "- {} *(responsible: {})*",
                    single_line(&control.action),
                    single_line(&control.responsible_person)
                )?;
            }
            writeln!(out)?;
            writeln!(out, "**Residual risk:** {}", entry.residual_risk)?;
        }
    }

    if !assessment.additional_notes().trim().is_empty() {
        writeln!(out)?;
        writeln!(out, "## Additional notes")?;
        writeln!(out)?;
        writeln!(out, "{}", assessment.additional_notes().trim())?;
    }

    writeln!(out)?;
    writeln!(out, "## Sign-off")?;
    writeln!(out)?;
    writeln!(
        out,
        "Assessed by: {}",
        assessment.assessor_name().unwrap_or("____________________")
    )?;
    writeln!(out)?;
    writeln!(out, "Signature: ____________________")?;
    Ok(out)
}

fn join_ages(groups: &[AgeGroup]) -> String {
    groups
        .iter()
        .map(|group| group.label())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn single_line(input: &str) -> String {
    input
        .trim()
        .chars()
        .map(|c| match c {
            '\n' | '\r' => ' ',
            _ => c,
        })
        .collect()
}

fn escape_cell(input: &str) -> String {
    single_line(input).replace('|', "\\|")
}

#[derive(Debug, Serialize)]
struct AssessmentDocument<'a> {
    activity_name: &'a str,
    activity_description: &'a str,
    location: &'a str,
    age_groups: &'a [AgeGroup],
    assessment_date: NaiveDate,
    assessor_name: Option<&'a str>,
    review_date: Option<NaiveDate>,
    overall_risk_level: RiskLevel,
    hazards: Vec<HazardDocument<'a>>,
    additional_notes: &'a str,
}

#[derive(Debug, Serialize)]
struct HazardDocument<'a> {
    description: &'a str,
    severity: Severity,
    likelihood: Likelihood,
    who_at_risk: &'a str,
    risk_level: RiskLevel,
    existing_controls: &'a [String],
    additional_controls: &'a [MitigationStrategy],
    residual_risk: RiskLevel,
}

impl<'a> From<&'a HazardWithMitigation> for HazardDocument<'a> {
    fn from(entry: &'a HazardWithMitigation) -> Self {
        Self {
            description: &entry.hazard.description,
            severity: entry.hazard.severity,
            likelihood: entry.hazard.likelihood,
            who_at_risk: &entry.hazard.who_at_risk,
            risk_level: entry.hazard.risk_level(),
            existing_controls: &entry.existing_controls,
            additional_controls: &entry.additional_controls,
            residual_risk: entry.residual_risk,
        }
    }
}

impl<'a> From<&'a RiskAssessment> for AssessmentDocument<'a> {
    fn from(assessment: &'a RiskAssessment) -> Self {
        Self {
            activity_name: assessment.activity_name(),
            activity_description: assessment.activity_description(),
            location: assessment.location(),
            age_groups: assessment.age_groups(),
            assessment_date: assessment.assessment_date(),
            assessor_name: assessment.assessor_name(),
            review_date: assessment.review_date(),
            overall_risk_level: assessment.overall_risk_level(),
            hazards: assessment.hazards().iter().map(HazardDocument::from).collect(),
            additional_notes: assessment.additional_notes(),
        }
    }
}
