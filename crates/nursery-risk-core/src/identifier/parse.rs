use serde_json::{Map, Value};

use crate::error::{AssessmentError, ValidationError};
use crate::model::{
    Hazard, HazardWithMitigation, Likelihood, MitigationStrategy, RiskLevel, Severity,
    DEFAULT_RESPONSIBLE_PERSON,
};

const FENCE: &str = "```";

/// Hazards and notes recovered from one model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAssessment {
    pub hazards: Vec<HazardWithMitigation>,
    pub additional_notes: String,
}

/// Remove a surrounding Markdown code fence, if present.
///
/// Keeps the lines between the opening fence line and the first closing fence line.
pub fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    if !text.starts_with(FENCE) {
        return text;
    }
    let Some(newline) = text.find('\n') else {
        return "";
    };
    let body = &text[newline + 1..];
    let mut end = body.len();
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        if line.trim_start().starts_with(FENCE) {
            end = offset;
            break;
        }
        offset += line.len();
    }
    body[..end].trim()
}

/// Parse raw model output into hazards, applying defaults for optional fields.
pub fn parse_model_output(raw: &str) -> Result<ParsedAssessment, AssessmentError> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))?;
    Ok(map_assessment(&value)?)
}

fn map_assessment(value: &Value) -> Result<ParsedAssessment, ValidationError> {
    let root = Fields::object(value, "response".to_string())?;
    // An absent or null `hazards` means the model found nothing to report.
    let hazards = match root.optional_array("hazards")? {
        Some(entries) => entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| map_hazard(entry, format!("hazards[{idx}]")))
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    let additional_notes = root.optional_str("additional_notes")?.unwrap_or_default();
    Ok(ParsedAssessment {
        hazards,
        additional_notes,
    })
}

fn map_hazard(value: &Value, location: String) -> Result<HazardWithMitigation, ValidationError> {
    let fields = Fields::object(value, location)?;
    let hazard = Hazard {
        description: fields.required_str("description")?,
        severity: fields.required_enum("severity", Severity::from_label, "Low, Medium, High")?,
        likelihood: fields.required_enum(
            "likelihood",
            Likelihood::from_label,
            "Unlikely, Possible, Likely",
        )?,
        who_at_risk: fields.required_str("who_at_risk")?,
    };

    let existing_controls = match fields.optional_array("existing_controls")? {
        Some(items) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| fields.invalid_type(&format!("existing_controls[{idx}]"), "a string"))
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    let additional_controls = match fields.optional_array("additional_controls")? {
        Some(items) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                map_mitigation(item, format!("{}.additional_controls[{idx}]", fields.location))
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    let residual_risk = match fields.optional_str("residual_risk")? {
        Some(label) => RiskLevel::from_label(&label).ok_or_else(|| {
            fields.invalid_enum("residual_risk", &label, "Low, Medium, High")
        })?,
        None => RiskLevel::Low,
    };

    Ok(HazardWithMitigation {
        hazard,
        existing_controls,
        additional_controls,
        residual_risk,
    })
}

fn map_mitigation(value: &Value, location: String) -> Result<MitigationStrategy, ValidationError> {
    let fields = Fields::object(value, location)?;
    Ok(MitigationStrategy {
        action: fields.required_str("action")?,
        responsible_person: fields
            .optional_str("responsible_person")?
            .unwrap_or_else(|| DEFAULT_RESPONSIBLE_PERSON.to_string()),
    })
}

/// Field accessor over one JSON object that reports problems by location.
struct Fields<'a> {
    map: &'a Map<String, Value>,
    location: String,
}

impl<'a> Fields<'a> {
    fn object(value: &'a Value, location: String) -> Result<Self, ValidationError> {
        match value.as_object() {
            Some(map) => Ok(Self { map, location }),
            None => Err(ValidationError::InvalidType {
                field: location.clone(),
                location,
                expected: "a JSON object",
            }),
        }
    }

    /// Absent and `null` are treated alike.
    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|value| !value.is_null())
    }

    fn missing(&self, field: &str) -> ValidationError {
        ValidationError::MissingField {
            location: self.location.clone(),
            field: field.to_string(),
        }
    }

    fn invalid_type(&self, field: &str, expected: &'static str) -> ValidationError {
        ValidationError::InvalidType {
            location: self.location.clone(),
            field: field.to_string(),
            expected,
        }
    }

    fn invalid_enum(&self, field: &str, value: &str, allowed: &'static str) -> ValidationError {
        ValidationError::InvalidEnumValue {
            location: self.location.clone(),
            field: field.to_string(),
            value: value.to_string(),
            allowed,
        }
    }

    fn optional_str(&self, key: &str) -> Result<Option<String>, ValidationError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(text)) => Ok(Some(text.clone())),
            Some(_) => Err(self.invalid_type(key, "a string")),
        }
    }

    fn required_str(&self, key: &str) -> Result<String, ValidationError> {
        self.optional_str(key)?.ok_or_else(|| self.missing(key))
    }

    fn required_enum<T>(
        &self,
        key: &str,
        lookup: fn(&str) -> Option<T>,
        allowed: &'static str,
    ) -> Result<T, ValidationError> {
        let label = self.required_str(key)?;
        lookup(&label).ok_or_else(|| self.invalid_enum(key, &label, allowed))
    }

    fn optional_array(&self, key: &str) -> Result<Option<&'a Vec<Value>>, ValidationError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(_) => Err(self.invalid_type(key, "an array")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_HAZARDS: &str = r#"{
        "hazards": [
            {
                "description": "Slipping on wet floor",
                "severity": "High",
                "likelihood": "Likely",
                "who_at_risk": "Children and staff",
                "existing_controls": ["Mats under the water table"],
                "additional_controls": [
                    {"action": "Mop spills immediately", "responsible_person": "Room Leader"},
                    {"action": "Limit four children at the table"}
                ],
                "residual_risk": "Medium"
            },
            {
                "description": "Water ingestion",
                "severity": "Low",
                "likelihood": "Unlikely",
                "who_at_risk": "Toddlers"
            }
        ],
        "additional_notes": "Change water daily."
    }"#;

    fn validation(raw: &str) -> ValidationError {
        match parse_model_output(raw) {
            Err(AssessmentError::Validation(err)) => err,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn maps_fields_and_applies_defaults() {
        let parsed = parse_model_output(TWO_HAZARDS).expect("valid response");
        assert_eq!(parsed.hazards.len(), 2);
        assert_eq!(parsed.additional_notes, "Change water daily.");

        let first = &parsed.hazards[0];
        assert_eq!(first.hazard.severity, Severity::High);
        assert_eq!(first.hazard.likelihood, Likelihood::Likely);
        assert_eq!(first.existing_controls, vec!["Mats under the water table"]);
        assert_eq!(first.additional_controls[0].responsible_person, "Room Leader");
        assert_eq!(first.additional_controls[1].responsible_person, "Nursery Staff");
        assert_eq!(first.residual_risk, RiskLevel::Medium);

        let second = &parsed.hazards[1];
        assert!(second.existing_controls.is_empty());
        assert!(second.additional_controls.is_empty());
        assert_eq!(second.residual_risk, RiskLevel::Low);
    }

    #[test]
    fn fenced_output_parses_like_plain_output() {
        let fenced = format!("```json\n{TWO_HAZARDS}\n```");
        assert_eq!(
            parse_model_output(&fenced).unwrap(),
            parse_model_output(TWO_HAZARDS).unwrap()
        );
    }

    #[test]
    fn strip_code_fence_handles_variants() {
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```json\n{}\n```\ntrailing chatter"), "{}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```"), "");
    }

    #[test]
    fn missing_notes_default_to_empty() {
        let parsed = parse_model_output(r#"{"hazards": []}"#).unwrap();
        assert!(parsed.hazards.is_empty());
        assert_eq!(parsed.additional_notes, "");
    }

    #[test]
    fn unknown_severity_is_rejected() {
        let err = validation(
            r#"{"hazards": [{"description": "d", "severity": "Critical",
                "likelihood": "Likely", "who_at_risk": "Children"}]}"#,
        );
        assert_eq!(err.field(), "severity");
        assert!(matches!(
            err,
            ValidationError::InvalidEnumValue { ref value, ref location, .. }
                if value == "Critical" && location == "hazards[0]"
        ));
    }

    #[test]
    fn unknown_likelihood_is_rejected() {
        let err = validation(
            r#"{"hazards": [{"description": "d", "severity": "Low",
                "likelihood": "Certain", "who_at_risk": "Children"}]}"#,
        );
        assert_eq!(err.field(), "likelihood");
    }

    #[test]
    fn unknown_residual_risk_is_rejected() {
        let err = validation(
            r#"{"hazards": [{"description": "d", "severity": "Low", "likelihood": "Unlikely",
                "who_at_risk": "Children", "residual_risk": "Negligible"}]}"#,
        );
        assert_eq!(err.field(), "residual_risk");
    }

    #[test]
    fn missing_required_fields_are_named() {
        let err = validation(
            r#"{"hazards": [{"severity": "Low", "likelihood": "Unlikely", "who_at_risk": "All"}]}"#,
        );
        assert_eq!(
            err,
            ValidationError::MissingField {
                location: "hazards[0]".into(),
                field: "description".into()
            }
        );

        let err = validation(
            r#"{"hazards": [{"description": "d", "severity": "Low", "likelihood": "Unlikely"}]}"#,
        );
        assert_eq!(err.field(), "who_at_risk");

        let err = validation(
            r#"{"hazards": [{"description": "d", "severity": "Low", "likelihood": "Unlikely",
                "who_at_risk": "All", "additional_controls": [{"responsible_person": "Cook"}]}]}"#,
        );
        assert_eq!(
            err,
            ValidationError::MissingField {
                location: "hazards[0].additional_controls[0]".into(),
                field: "action".into()
            }
        );
    }

    #[test]
    fn missing_hazards_key_means_no_hazards() {
        let parsed = parse_model_output(r#"{"additional_notes": "Nothing significant."}"#).unwrap();
        assert!(parsed.hazards.is_empty());
        assert_eq!(parsed.additional_notes, "Nothing significant.");

        let parsed = parse_model_output(r#"{"hazards": null}"#).unwrap();
        assert!(parsed.hazards.is_empty());
    }

    #[test]
    fn wrong_types_are_validation_errors() {
        let err = validation(r#"{"hazards": {"description": "not a list"}}"#);
        assert!(matches!(err, ValidationError::InvalidType { ref field, .. } if field == "hazards"));

        let err = validation(
            r#"{"hazards": [{"description": "d", "severity": "Low", "likelihood": "Unlikely",
                "who_at_risk": "All", "existing_controls": ["ok", 3]}]}"#,
        );
        assert_eq!(err.field(), "existing_controls[1]");

        assert!(matches!(validation("[]"), ValidationError::InvalidType { .. }));
    }

    #[test]
    fn truncated_output_is_a_parse_error() {
        let truncated = &TWO_HAZARDS[..TWO_HAZARDS.len() / 2];
        assert!(matches!(
            parse_model_output(truncated),
            Err(AssessmentError::Parse(_))
        ));
        assert!(matches!(
            parse_model_output("I'm sorry, I can't help with that."),
            Err(AssessmentError::Parse(_))
        ));
    }
}
