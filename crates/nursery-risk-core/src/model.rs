use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Responsible person recorded when the model does not name one.
pub const DEFAULT_RESPONSIBLE_PERSON: &str = "Nursery Staff";

/// Location used when the caller does not supply one.
pub const DEFAULT_LOCATION: &str = "Nursery";

/// How badly someone could be hurt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    fn score(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    /// Exact-label lookup; anything outside the three labels is rejected.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|value| value.label() == label)
    }
}

/// How probable it is that the harm occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Likelihood {
    Unlikely,
    Possible,
    Likely,
}

impl Likelihood {
    pub const ALL: [Likelihood; 3] = [Likelihood::Unlikely, Likelihood::Possible, Likelihood::Likely];

    pub fn label(self) -> &'static str {
        match self {
            Self::Unlikely => "Unlikely",
            Self::Possible => "Possible",
            Self::Likely => "Likely",
        }
    }

    fn score(self) -> u8 {
        match self {
            Self::Unlikely => 1,
            Self::Possible => 2,
            Self::Likely => 3,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|value| value.label() == label)
    }
}

/// Qualitative risk classification, ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    /// Classify a severity × likelihood product (1–9).
    pub fn from_score(score: u8) -> Self {
        if score <= 2 {
            Self::Low
        } else if score <= 4 {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|value| value.label() == label)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Likelihood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Developmental-stage band used to tailor the hazard analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "0-12 months")]
    Baby,
    #[serde(rename = "1-2 years")]
    Toddler,
    #[serde(rename = "2-3 years")]
    TwoToThree,
    #[serde(rename = "3-4 years")]
    ThreeToFour,
    #[serde(rename = "4-5 years")]
    FourToFive,
    #[serde(rename = "All ages")]
    AllAges,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 6] = [
        AgeGroup::Baby,
        AgeGroup::Toddler,
        AgeGroup::TwoToThree,
        AgeGroup::ThreeToFour,
        AgeGroup::FourToFive,
        AgeGroup::AllAges,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Baby => "0-12 months",
            Self::Toddler => "1-2 years",
            Self::TwoToThree => "2-3 years",
            Self::ThreeToFour => "3-4 years",
            Self::FourToFive => "4-5 years",
            Self::AllAges => "All ages",
        }
    }

    /// Short name accepted on the command line.
    pub fn alias(self) -> &'static str {
        self.aliases()[0]
    }

    /// Every short name that parses to this group, the preferred one first.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Baby => &["baby"],
            Self::Toddler => &["toddler"],
            Self::TwoToThree => &["preschool", "2-3"],
            Self::ThreeToFour => &["pre-k", "pre_k", "3-4"],
            Self::FourToFive => &["reception", "4-5"],
            Self::AllAges => &["all"],
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AgeGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|group| {
                group.label().eq_ignore_ascii_case(needle)
                    || group
                        .aliases()
                        .iter()
                        .any(|alias| alias.eq_ignore_ascii_case(needle))
            })
            .ok_or_else(|| {
                let known = Self::ALL
                    .iter()
                    .map(|group| group.alias())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("unknown age group `{needle}` (expected one of: {known})")
            })
    }
}

/// A potential source of harm identified for an activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hazard {
    pub description: String,
    pub severity: Severity,
    pub likelihood: Likelihood,
    pub who_at_risk: String,
}

impl Hazard {
    /// Fixed severity × likelihood lookup: product ≤ 2 is Low, ≤ 4 Medium, otherwise High.
    pub fn risk_level(&self) -> RiskLevel {
        risk_level(self.severity, self.likelihood)
    }
}

/// Risk level for a severity/likelihood pair.
pub fn risk_level(severity: Severity, likelihood: Likelihood) -> RiskLevel {
    RiskLevel::from_score(severity.score() * likelihood.score())
}

/// An additional control and who carries it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MitigationStrategy {
    pub action: String,
    pub responsible_person: String,
}

impl MitigationStrategy {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            responsible_person: DEFAULT_RESPONSIBLE_PERSON.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardWithMitigation {
    pub hazard: Hazard,
    pub existing_controls: Vec<String>,
    pub additional_controls: Vec<MitigationStrategy>,
    pub residual_risk: RiskLevel,
}

impl HazardWithMitigation {
    pub fn new(hazard: Hazard) -> Self {
        Self {
            hazard,
            existing_controls: Vec::new(),
            additional_controls: Vec::new(),
            residual_risk: RiskLevel::Low,
        }
    }
}

/// A complete risk assessment for one activity.
///
/// Content is fixed at construction; only the assessor and the review date
/// can be attached afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    activity_name: String,
    activity_description: String,
    location: String,
    age_groups: Vec<AgeGroup>,
    hazards: Vec<HazardWithMitigation>,
    assessment_date: NaiveDate,
    assessor_name: Option<String>,
    review_date: Option<NaiveDate>,
    additional_notes: String,
}

impl RiskAssessment {
    /// Build an assessment dated `assessment_date`.
    ///
    /// Age groups are de-duplicated in insertion order; an empty list becomes `[AllAges]`.
    pub fn new(
        activity_name: impl Into<String>,
        activity_description: impl Into<String>,
        location: impl Into<String>,
        age_groups: impl IntoIterator<Item = AgeGroup>,
        hazards: Vec<HazardWithMitigation>,
        assessment_date: NaiveDate,
        additional_notes: impl Into<String>,
    ) -> Self {
        Self {
            activity_name: activity_name.into(),
            activity_description: activity_description.into(),
            location: location.into(),
            age_groups: normalize_age_groups(age_groups),
            hazards,
            assessment_date,
            assessor_name: None,
            review_date: None,
            additional_notes: additional_notes.into(),
        }
    }

    pub fn activity_name(&self) -> &str {
        &self.activity_name
    }

    pub fn activity_description(&self) -> &str {
        &self.activity_description
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn age_groups(&self) -> &[AgeGroup] {
        &self.age_groups
    }

    pub fn hazards(&self) -> &[HazardWithMitigation] {
        &self.hazards
    }

    pub fn assessment_date(&self) -> NaiveDate {
        self.assessment_date
    }

    pub fn assessor_name(&self) -> Option<&str> {
        self.assessor_name.as_deref()
    }

    pub fn review_date(&self) -> Option<NaiveDate> {
        self.review_date
    }

    pub fn additional_notes(&self) -> &str {
        &self.additional_notes
    }

    /// Attach the name of the person signing off the assessment. Blank names clear it.
    pub fn set_assessor_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        let trimmed = name.trim();
        self.assessor_name = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    pub fn set_review_date(&mut self, review_date: Option<NaiveDate>) {
        self.review_date = review_date;
    }

    /// Highest hazard risk level, or `Low` when nothing was identified.
    pub fn overall_risk_level(&self) -> RiskLevel {
        self.hazards
            .iter()
            .map(|entry| entry.hazard.risk_level())
            .max()
            .unwrap_or(RiskLevel::Low)
    }

    /// One calendar year after the assessment date.
    pub fn default_review_date(&self) -> NaiveDate {
        self.assessment_date
            .checked_add_months(Months::new(12))
            .unwrap_or(self.assessment_date)
    }

    /// Document reference in the form `YYMMDD-INITIALS-HHMMSS`.
    pub fn reference_id(&self, at: NaiveTime) -> String {
        let initials = self
            .assessor_name
            .as_deref()
            .map(|name| {
                name.split_whitespace()
                    .filter_map(|word| word.chars().next())
                    .flat_map(char::to_uppercase)
                    .collect::<String>()
            })
            .filter(|initials| !initials.is_empty())
            .unwrap_or_else(|| "XX".to_string());
        format!(
            "{:02}{:02}{:02}-{}-{:02}{:02}{:02}",
            self.assessment_date.year() % 100,
            self.assessment_date.month(),
            self.assessment_date.day(),
            initials,
            at.hour(),
            at.minute(),
            at.second()
        )
    }

    /// File name for a rendered copy of this assessment.
    pub fn suggested_file_name(&self, extension: &str) -> String {
        let activity: String = self
            .activity_name
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
                _ => c,
            })
            .collect();
        let activity = match activity.trim() {
            "" => "General",
            trimmed => trimmed,
        };
        format!(
            "Risk Assessment - {} - {}.{}",
            activity,
            self.assessment_date.format("%Y-%m-%d"),
            extension.trim_start_matches('.')
        )
    }
}

fn normalize_age_groups(groups: impl IntoIterator<Item = AgeGroup>) -> Vec<AgeGroup> {
    let mut normalized: Vec<AgeGroup> = Vec::new();
    for group in groups {
        if !normalized.contains(&group) {
            normalized.push(group);
        }
    }
    if normalized.is_empty() {
        normalized.push(AgeGroup::AllAges);
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hazard(severity: Severity, likelihood: Likelihood) -> HazardWithMitigation {
        HazardWithMitigation::new(Hazard {
            description: format!("{severity} / {likelihood}"),
            severity,
            likelihood,
            who_at_risk: "Children".into(),
        })
    }

    fn assessment(hazards: Vec<HazardWithMitigation>) -> RiskAssessment {
        RiskAssessment::new(
            "Water Play",
            "Children play with water table",
            "Garden",
            [AgeGroup::Toddler],
            hazards,
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            "",
        )
    }

    #[test]
    fn risk_matrix_matches_fixed_table() {
        use Likelihood::*;
        let expected = [
            (Severity::Low, Unlikely, RiskLevel::Low),
            (Severity::Low, Possible, RiskLevel::Low),
            (Severity::Low, Likely, RiskLevel::Medium),
            (Severity::Medium, Unlikely, RiskLevel::Low),
            (Severity::Medium, Possible, RiskLevel::Medium),
            (Severity::Medium, Likely, RiskLevel::High),
            (Severity::High, Unlikely, RiskLevel::Medium),
            (Severity::High, Possible, RiskLevel::High),
            (Severity::High, Likely, RiskLevel::High),
        ];
        for (severity, likelihood, level) in expected {
            assert_eq!(
                hazard(severity, likelihood).hazard.risk_level(),
                level,
                "{severity}/{likelihood}"
            );
        }
    }

    #[test]
    fn overall_risk_is_low_without_hazards() {
        assert_eq!(assessment(vec![]).overall_risk_level(), RiskLevel::Low);
    }

    #[test]
    fn overall_risk_takes_highest_level() {
        let low = hazard(Severity::Low, Likelihood::Unlikely);
        let high = hazard(Severity::High, Likelihood::Likely);
        let medium = hazard(Severity::Medium, Likelihood::Possible);
        let forward = assessment(vec![low.clone(), high.clone(), medium.clone()]);
        let reversed = assessment(vec![medium, high, low]);
        assert_eq!(forward.overall_risk_level(), RiskLevel::High);
        assert_eq!(reversed.overall_risk_level(), RiskLevel::High);
    }

    #[test]
    fn age_groups_default_to_all_ages() {
        let assessment = RiskAssessment::new(
            "Story Time",
            "Reading on the carpet",
            DEFAULT_LOCATION,
            [],
            vec![],
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "",
        );
        assert_eq!(assessment.age_groups(), &[AgeGroup::AllAges]);
    }

    #[test]
    fn age_groups_keep_first_occurrence_order() {
        let assessment = RiskAssessment::new(
            "Messy Play",
            "Paint and sand",
            DEFAULT_LOCATION,
            [AgeGroup::FourToFive, AgeGroup::Baby, AgeGroup::FourToFive],
            vec![],
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "",
        );
        assert_eq!(assessment.age_groups(), &[AgeGroup::FourToFive, AgeGroup::Baby]);
    }

    #[test]
    fn age_group_parses_labels_and_aliases() {
        assert_eq!("toddler".parse::<AgeGroup>().unwrap(), AgeGroup::Toddler);
        assert_eq!("0-12 months".parse::<AgeGroup>().unwrap(), AgeGroup::Baby);
        assert_eq!(" All ages ".parse::<AgeGroup>().unwrap(), AgeGroup::AllAges);
        assert_eq!("preschool".parse::<AgeGroup>().unwrap(), AgeGroup::TwoToThree);
        assert_eq!("Pre-K".parse::<AgeGroup>().unwrap(), AgeGroup::ThreeToFour);
        assert_eq!("pre_k".parse::<AgeGroup>().unwrap(), AgeGroup::ThreeToFour);
        assert_eq!("reception".parse::<AgeGroup>().unwrap(), AgeGroup::FourToFive);
        assert_eq!("3-4".parse::<AgeGroup>().unwrap(), AgeGroup::ThreeToFour);
        assert_eq!(AgeGroup::ThreeToFour.alias(), "pre-k");
        let err = "teenagers".parse::<AgeGroup>().unwrap_err();
        assert!(err.contains("teenagers"));
    }

    #[test]
    fn enum_labels_are_exact() {
        assert_eq!(Severity::from_label("High"), Some(Severity::High));
        assert_eq!(Severity::from_label("high"), None);
        assert_eq!(Likelihood::from_label("Critical"), None);
        assert_eq!(RiskLevel::from_label("Medium"), Some(RiskLevel::Medium));
    }

    #[test]
    fn review_date_defaults_one_year_out() {
        let leap = RiskAssessment::new(
            "Sports Day",
            "Races on the field",
            "Field",
            [],
            vec![],
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
            "",
        );
        assert_eq!(
            leap.default_review_date(),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
        );
        assert!(leap.review_date().is_none());
    }

    #[test]
    fn reference_id_uses_assessor_initials() {
        let mut assessment = assessment(vec![]);
        let at = NaiveTime::from_hms_opt(9, 4, 7).unwrap();
        assert_eq!(assessment.reference_id(at), "240305-XX-090407");
        assessment.set_assessor_name("jane van doe");
        assert_eq!(assessment.reference_id(at), "240305-JVD-090407");
        assessment.set_assessor_name("   ");
        assert!(assessment.assessor_name().is_none());
    }

    #[test]
    fn suggested_file_name_strips_path_separators() {
        let assessment = RiskAssessment::new(
            "Baking / Cooking",
            "Making biscuits",
            DEFAULT_LOCATION,
            [],
            vec![],
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            "",
        );
        assert_eq!(
            assessment.suggested_file_name(".md"),
            "Risk Assessment - Baking - Cooking - 2024-06-01.md"
        );
    }

    fn any_severity() -> impl Strategy<Value = Severity> {
        prop::sample::select(Severity::ALL.to_vec())
    }

    fn any_likelihood() -> impl Strategy<Value = Likelihood> {
        prop::sample::select(Likelihood::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn overall_risk_is_order_independent(
            pairs in prop::collection::vec((any_severity(), any_likelihood()), 1..8)
        ) {
            let hazards: Vec<_> = pairs.iter().map(|(s, l)| hazard(*s, *l)).collect();
            let mut reversed = hazards.clone();
            reversed.reverse();
            let expected = pairs.iter().map(|(s, l)| risk_level(*s, *l)).max().unwrap();
            prop_assert_eq!(assessment(hazards).overall_risk_level(), expected);
            prop_assert_eq!(assessment(reversed).overall_risk_level(), expected);
        }

        #[test]
        fn raising_severity_never_lowers_risk(likelihood in any_likelihood()) {
            let levels: Vec<_> = Severity::ALL.iter().map(|s| risk_level(*s, likelihood)).collect();
            prop_assert!(levels.windows(2).all(|pair| pair[0] <= pair[1]));
        }
    }
}
