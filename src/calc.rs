use crate::model::{GradedResult, MarksEntry, SubjectResult};
use crate::scales::CurriculumRules;
use serde::{Serialize, Serializer};
use serde_json::json;

/// Label used wherever a grade, division or statistic cannot be computed.
pub const NOT_AVAILABLE: &str = "N/A";

/// Hard failure: unknown curriculum, corrupt scale data, malformed input.
/// Data-quality problems never use this; they become [`Warning`]s.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct CalcError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl CalcError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    MissingMarks,
    MarksOutOfRange,
    MarksNotNumeric,
    InsufficientSubjects,
    MissingCoreSubjects,
    InsufficientSubsidiaries,
    MissingPrincipalFlag,
    MissingTotalPoints,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub code: WarningCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    pub message: String,
}

impl Warning {
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            subject_id: None,
            student_id: None,
            message: message.into(),
        }
    }

    pub fn for_result(mut self, result: &SubjectResult) -> Self {
        self.subject_id = Some(result.subject_id.clone());
        if !result.student_id.is_empty() {
            self.student_id = Some(result.student_id.clone());
        }
        self
    }
}

/// Half-up rounding to 2 decimals, `Int(100*x + 0.5) / 100`.
pub fn round_off_2_decimals(x: f64) -> f64 {
    ((100.0 * x) + 0.5).floor() / 100.0
}

/// Half-up rounding to a whole mark, `Int(x + 0.5)`.
pub fn round_off_whole(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// A rounded statistic that renders as a number, or "N/A" when there was
/// nothing to compute it from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metric(pub Option<f64>);

impl Metric {
    pub fn mean(sum: f64, count: usize) -> Self {
        if count == 0 {
            return Metric(None);
        }
        Metric(Some(round_off_2_decimals(sum / count as f64)))
    }

    pub fn percent(part: usize, whole: usize) -> Self {
        if whole == 0 {
            return Metric(None);
        }
        Metric(Some(round_off_2_decimals(100.0 * part as f64 / whole as f64)))
    }

    pub fn value(self) -> Option<f64> {
        self.0
    }
}

impl Serialize for Metric {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0 {
            Some(v) => serializer.serialize_f64(v),
            None => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeOutcome {
    pub grade: String,
    pub points: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<Warning>,
}

impl GradeOutcome {
    fn not_available(warning: Warning) -> Self {
        Self {
            grade: NOT_AVAILABLE.to_string(),
            points: 0,
            warning: Some(warning),
        }
    }

    pub fn is_graded(&self) -> bool {
        self.grade != NOT_AVAILABLE
    }
}

/// Resolves marks to a grade and points on the curriculum's scale.
///
/// Unusable marks give `N/A` / 0 points with a warning. A valid mark that no
/// band covers means the scale itself is broken and is returned as an error.
pub fn resolve_grade(marks: &MarksEntry, rules: &CurriculumRules) -> Result<GradeOutcome, CalcError> {
    let value = match marks {
        MarksEntry::Absent => {
            return Ok(GradeOutcome::not_available(Warning::new(
                WarningCode::MissingMarks,
                "marks not recorded",
            )))
        }
        MarksEntry::Invalid(raw) => {
            return Ok(GradeOutcome::not_available(Warning::new(
                WarningCode::MarksNotNumeric,
                format!("marks value {:?} is not a number", raw),
            )))
        }
        MarksEntry::Value(v) => *v,
    };
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Ok(GradeOutcome::not_available(Warning::new(
            WarningCode::MarksOutOfRange,
            format!("marks {} outside 0-100", value),
        )));
    }

    let whole = round_off_whole(value) as u32;
    rules
        .grades
        .iter()
        .find(|b| whole >= b.min_marks && whole <= b.max_marks)
        .map(|b| GradeOutcome {
            grade: b.grade.clone(),
            points: b.points,
            warning: None,
        })
        .ok_or_else(|| {
            CalcError::new(
                "scale_gap",
                format!("no {} grade band covers marks {}", rules.curriculum, whole),
            )
            .with_details(json!({ "curriculum": rules.curriculum, "marks": whole }))
        })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DivisionOutcome {
    pub division: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<Warning>,
}

/// Classifies a best-subject point total into a division.
///
/// Totals below the first band are only reachable with fewer subjects than the
/// curriculum requires. They land in the worst division so an incomplete
/// record never counts as a pass.
pub fn classify_division(
    total_points: Option<u32>,
    rules: &CurriculumRules,
) -> Result<DivisionOutcome, CalcError> {
    let Some(points) = total_points else {
        return Ok(DivisionOutcome {
            division: NOT_AVAILABLE.to_string(),
            warning: Some(Warning::new(
                WarningCode::MissingTotalPoints,
                "total points not available",
            )),
        });
    };

    if let Some(band) = rules.divisions.iter().find(|b| b.contains(points)) {
        return Ok(DivisionOutcome {
            division: band.division.clone(),
            warning: None,
        });
    }

    let first = rules.divisions.iter().map(|b| b.min_points).min();
    let worst = rules.divisions.iter().max_by_key(|b| b.min_points);
    match (first, worst) {
        (Some(min), Some(worst)) if points < min => Ok(DivisionOutcome {
            division: worst.division.clone(),
            warning: None,
        }),
        _ => Err(CalcError::new(
            "scale_gap",
            format!("no {} division band covers {} points", rules.curriculum, points),
        )
        .with_details(json!({ "curriculum": rules.curriculum, "points": points }))),
    }
}

/// Grades every result, collecting the data-quality warnings raised on the way.
pub fn grade_results(
    results: &[SubjectResult],
    rules: &CurriculumRules,
) -> Result<(Vec<GradedResult>, Vec<Warning>), CalcError> {
    let mut graded = Vec::with_capacity(results.len());
    let mut warnings = Vec::new();
    for r in results {
        let outcome = resolve_grade(&r.marks_obtained, rules)?;
        if let Some(w) = outcome.warning {
            warnings.push(w.for_result(r));
        }
        graded.push(GradedResult {
            subject_id: r.subject_id.clone(),
            subject_code: r.code().to_string(),
            student_id: r.student_id.clone(),
            marks_obtained: r.marks_obtained.clone(),
            grade: outcome.grade,
            points: outcome.points,
            is_principal: r.is_principal,
        });
    }
    Ok((graded, warnings))
}
