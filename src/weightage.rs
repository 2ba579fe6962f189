//! Assessment weightage checks.
//!
//! The validator only sees the snapshot of sibling assessments it is given.
//! Two concurrent creates in one scope can both pass against the same
//! snapshot, so callers must hold a transaction or per-scope lock from
//! validation through persistence.

use crate::calc::round_off_2_decimals;
use serde::{Deserialize, Deserializer, Serialize};

const FULL_ALLOCATION: f64 = 100.0;
const TOLERANCE: f64 = 1e-9;

/// Which fields make two assessments siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeRule {
    /// term + academic year + subject
    #[default]
    Subject,
    /// term + academic year + class
    Class,
    /// term + academic year + subject + class
    SubjectAndClass,
}

impl ScopeRule {
    pub fn same_scope(self, a: &AssessmentScope, b: &AssessmentScope) -> bool {
        let base = a.term.trim().eq_ignore_ascii_case(b.term.trim())
            && a.academic_year.trim().eq_ignore_ascii_case(b.academic_year.trim());
        let subject = a.subject_id == b.subject_id;
        let class = a.class_id == b.class_id;
        match self {
            ScopeRule::Subject => base && subject,
            ScopeRule::Class => base && class,
            ScopeRule::SubjectAndClass => base && subject && class,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentScope {
    #[serde(deserialize_with = "string_or_number")]
    pub term: String,
    #[serde(deserialize_with = "string_or_number")]
    pub academic_year: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub scope: AssessmentScope,
    pub weightage_percent: f64,
    #[serde(default = "default_max_marks")]
    pub max_marks: f64,
}

fn default_max_marks() -> f64 {
    100.0
}

impl Assessment {
    fn same_identity(&self, other: &Assessment) -> bool {
        matches!((&self.id, &other.id), (Some(a), Some(b)) if a == b)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s.trim().to_string()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightageVerdict {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub requested_percent: f64,
    pub allocated_percent: f64,
    pub remaining_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightageAllocation {
    pub scope: AssessmentScope,
    pub assessment_count: usize,
    pub allocated_percent: f64,
    pub remaining_percent: f64,
}

/// Sum and count of sibling weights. Stored weights outside 0..=100 (or not
/// finite) are skipped so a corrupt sibling cannot free up headroom.
fn sibling_total<'a, I>(siblings: I) -> (f64, usize)
where
    I: IntoIterator<Item = &'a Assessment>,
{
    siblings
        .into_iter()
        .filter(|a| (0.0..=FULL_ALLOCATION).contains(&a.weightage_percent))
        .fold((0.0, 0), |(sum, n), a| (sum + a.weightage_percent, n + 1))
}

/// Checks that adding (or replacing) `candidate` keeps its scope at or under 100%.
pub fn validate_weightage(
    existing: &[Assessment],
    candidate: &Assessment,
    rule: ScopeRule,
) -> WeightageVerdict {
    let (allocated, _) = sibling_total(
        existing
            .iter()
            .filter(|a| rule.same_scope(&a.scope, &candidate.scope))
            .filter(|a| !a.same_identity(candidate)),
    );
    let remaining = (FULL_ALLOCATION - allocated).max(0.0);
    let requested = candidate.weightage_percent;

    let reject = |message: String| WeightageVerdict {
        is_valid: false,
        error: Some(message),
        requested_percent: requested,
        allocated_percent: round_off_2_decimals(allocated),
        remaining_percent: round_off_2_decimals(remaining),
    };

    if !requested.is_finite() || !(0.0..=FULL_ALLOCATION).contains(&requested) {
        return reject(format!(
            "weightage must be between 0 and 100, got {}",
            requested
        ));
    }
    if !candidate.max_marks.is_finite() || candidate.max_marks <= 0.0 {
        return reject(format!(
            "max marks must be greater than 0, got {}",
            candidate.max_marks
        ));
    }
    if allocated + requested > FULL_ALLOCATION + TOLERANCE {
        return reject(format!(
            "weightage of {}% would bring this scope to {}%: {}% already allocated, {}% remaining",
            requested,
            round_off_2_decimals(allocated + requested),
            round_off_2_decimals(allocated),
            round_off_2_decimals(remaining)
        ));
    }

    WeightageVerdict {
        is_valid: true,
        error: None,
        requested_percent: requested,
        allocated_percent: round_off_2_decimals(allocated),
        remaining_percent: round_off_2_decimals(remaining),
    }
}

/// Current allocation within one scope.
pub fn allocation_summary(
    existing: &[Assessment],
    scope: &AssessmentScope,
    rule: ScopeRule,
) -> WeightageAllocation {
    let (allocated, count) = sibling_total(
        existing
            .iter()
            .filter(|a| rule.same_scope(&a.scope, scope)),
    );
    WeightageAllocation {
        scope: scope.clone(),
        assessment_count: count,
        allocated_percent: round_off_2_decimals(allocated),
        remaining_percent: round_off_2_decimals((FULL_ALLOCATION - allocated).max(0.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assessment(id: &str, subject: &str, weight: f64) -> Assessment {
        Assessment {
            id: Some(id.to_string()),
            name: None,
            scope: AssessmentScope {
                term: "Term 1".to_string(),
                academic_year: "2025".to_string(),
                subject_id: Some(subject.to_string()),
                class_id: Some("form-2".to_string()),
            },
            weightage_percent: weight,
            max_marks: 100.0,
        }
    }

    #[test]
    fn sixty_plus_forty_fits_but_forty_one_does_not() {
        let existing = vec![assessment("a1", "math", 30.0), assessment("a2", "math", 30.0)];
        let ok = validate_weightage(&existing, &assessment("new", "math", 40.0), ScopeRule::Subject);
        assert!(ok.is_valid);
        assert_eq!(ok.allocated_percent, 60.0);
        assert_eq!(ok.remaining_percent, 40.0);

        let over =
            validate_weightage(&existing, &assessment("new", "math", 41.0), ScopeRule::Subject);
        assert!(!over.is_valid);
        let msg = over.error.expect("error message");
        assert!(msg.contains("60% already allocated"), "{}", msg);
        assert!(msg.contains("40% remaining"), "{}", msg);
    }

    #[test]
    fn update_in_place_excludes_itself() {
        let existing = vec![assessment("a1", "math", 70.0), assessment("a2", "math", 30.0)];
        let verdict =
            validate_weightage(&existing, &assessment("a2", "math", 30.0), ScopeRule::Subject);
        assert!(verdict.is_valid);
        let verdict =
            validate_weightage(&existing, &assessment("a2", "math", 31.0), ScopeRule::Subject);
        assert!(!verdict.is_valid);
    }

    #[test]
    fn other_scopes_do_not_count() {
        let existing = vec![assessment("a1", "eng", 90.0)];
        let verdict =
            validate_weightage(&existing, &assessment("new", "math", 50.0), ScopeRule::Subject);
        assert!(verdict.is_valid);
        // Same class, so under the class rule they are siblings.
        let verdict =
            validate_weightage(&existing, &assessment("new", "math", 50.0), ScopeRule::Class);
        assert!(!verdict.is_valid);
    }

    #[test]
    fn fractional_weights_summing_to_100_are_accepted() {
        let existing = vec![assessment("a1", "math", 33.3), assessment("a2", "math", 33.3)];
        let verdict =
            validate_weightage(&existing, &assessment("a3", "math", 33.4), ScopeRule::Subject);
        assert!(verdict.is_valid, "{:?}", verdict.error);
    }

    #[test]
    fn out_of_range_candidate_is_rejected() {
        let verdict = validate_weightage(&[], &assessment("a1", "math", 120.0), ScopeRule::Subject);
        assert!(!verdict.is_valid);
        let mut zero_max = assessment("a1", "math", 10.0);
        zero_max.max_marks = 0.0;
        assert!(!validate_weightage(&[], &zero_max, ScopeRule::Subject).is_valid);
    }

    #[test]
    fn negative_sibling_does_not_make_room() {
        let existing = vec![assessment("a1", "math", -30.0), assessment("a2", "math", 60.0)];
        let verdict =
            validate_weightage(&existing, &assessment("new", "math", 70.0), ScopeRule::Subject);
        assert!(!verdict.is_valid);
        assert_eq!(verdict.allocated_percent, 60.0);
        assert_eq!(verdict.remaining_percent, 40.0);

        let summary = allocation_summary(&existing, &existing[0].scope, ScopeRule::Subject);
        assert_eq!(summary.assessment_count, 1);
        assert_eq!(summary.allocated_percent, 60.0);
    }

    #[test]
    fn deserializes_flat_records_with_numeric_terms() {
        let a: Assessment = serde_json::from_value(json!({
            "id": "x",
            "term": 2,
            "academicYear": 2025,
            "subjectId": "math",
            "weightagePercent": 25
        }))
        .expect("parse");
        assert_eq!(a.scope.term, "2");
        assert_eq!(a.scope.academic_year, "2025");
        assert_eq!(a.max_marks, 100.0);
    }

    #[test]
    fn allocation_summary_reports_headroom() {
        let existing = vec![
            assessment("a1", "math", 25.0),
            assessment("a2", "math", 15.5),
            assessment("a3", "eng", 50.0),
        ];
        let summary = allocation_summary(&existing, &existing[0].scope, ScopeRule::Subject);
        assert_eq!(summary.assessment_count, 2);
        assert_eq!(summary.allocated_percent, 40.5);
        assert_eq!(summary.remaining_percent, 59.5);
    }
}
