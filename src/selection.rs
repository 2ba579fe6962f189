use crate::calc::{
    classify_division, grade_results, CalcError, Warning, WarningCode, NOT_AVAILABLE,
};
use crate::model::{GradedResult, SubjectResult};
use crate::scales::{CurriculumRules, SelectionPool};
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestSubjectSelection {
    pub selected: Vec<GradedResult>,
    pub total_points: u32,
    pub division: String,
    pub is_valid: bool,
    pub warnings: Vec<Warning>,
    pub missing_count: usize,
    pub required_count: usize,
}

impl BestSubjectSelection {
    pub fn has_division(&self) -> bool {
        self.division != NOT_AVAILABLE
    }
}

/// Picks the best-N subjects for one student and classifies the total.
///
/// Data-quality problems are reported in `warnings`; the only errors are
/// configuration defects surfaced by the scale lookups.
pub fn select_best_subjects(
    results: &[SubjectResult],
    rules: &CurriculumRules,
) -> Result<BestSubjectSelection, CalcError> {
    let (graded, warnings) = grade_results(results, rules)?;
    select_from_graded(&graded, warnings, rules)
}

/// Same as [`select_best_subjects`] over results that were already graded.
/// `warnings` carries anything raised while grading them.
pub fn select_from_graded(
    graded: &[GradedResult],
    mut warnings: Vec<Warning>,
    rules: &CurriculumRules,
) -> Result<BestSubjectSelection, CalcError> {
    let principal_only = rules.selection.pool == SelectionPool::Principal;
    if principal_only {
        for r in graded.iter().filter(|r| r.is_principal.is_none()) {
            warnings.push(missing_principal_flag(r));
        }
    }

    let mut pool: Vec<&GradedResult> = graded
        .iter()
        .filter(|r| r.is_graded())
        .filter(|r| !principal_only || r.is_principal == Some(true))
        .collect();
    pool.sort_by(|a, b| selection_order(a, b));

    let required = rules.selection.best_count;
    let selected: Vec<GradedResult> = pool.iter().take(required).map(|r| (*r).clone()).collect();
    let total_points: u32 = selected.iter().map(|r| r.points).sum();
    let missing_count = required.saturating_sub(pool.len());

    if missing_count > 0 {
        let kind = if principal_only { "principal " } else { "" };
        warnings.push(Warning::new(
            WarningCode::InsufficientSubjects,
            format!(
                "{} of {} required graded {}subjects available",
                pool.len(),
                required,
                kind
            ),
        ));
    }

    let division = if selected.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        classify_division(Some(total_points), rules)?.division
    };

    let missing_core = missing_core_subjects(graded, &rules.core_subjects);
    if !missing_core.is_empty() {
        warnings.push(Warning::new(
            WarningCode::MissingCoreSubjects,
            format!("missing core subjects: {}", missing_core.join(", ")),
        ));
    }

    // Only graded subsidiaries count; an unflagged result is a subsidiary.
    if rules.min_subsidiaries > 0 {
        let subsidiaries = graded
            .iter()
            .filter(|r| r.is_graded() && r.is_principal != Some(true))
            .count();
        if subsidiaries < rules.min_subsidiaries {
            warnings.push(Warning::new(
                WarningCode::InsufficientSubsidiaries,
                format!(
                    "{} graded subsidiary subjects, at least {} expected",
                    subsidiaries, rules.min_subsidiaries
                ),
            ));
        }
    }

    Ok(BestSubjectSelection {
        selected,
        total_points,
        division,
        is_valid: missing_count == 0,
        warnings,
        missing_count,
        required_count: required,
    })
}

/// Lower points first; equal points fall back to subject code, then subject id.
/// The sort is stable, so anything still tied keeps input order.
fn selection_order(a: &GradedResult, b: &GradedResult) -> Ordering {
    a.points
        .cmp(&b.points)
        .then_with(|| {
            a.subject_code
                .to_ascii_lowercase()
                .cmp(&b.subject_code.to_ascii_lowercase())
        })
        .then_with(|| a.subject_id.cmp(&b.subject_id))
}

fn missing_core_subjects(graded: &[GradedResult], core: &[String]) -> Vec<String> {
    core.iter()
        .filter(|code| {
            !graded
                .iter()
                .any(|r| r.subject_code.trim().eq_ignore_ascii_case(code.trim()))
        })
        .cloned()
        .collect()
}

pub(crate) fn missing_principal_flag(r: &GradedResult) -> Warning {
    Warning {
        code: WarningCode::MissingPrincipalFlag,
        subject_id: Some(r.subject_id.clone()),
        student_id: Some(r.student_id.clone()).filter(|s| !s.is_empty()),
        message: format!(
            "subject {} has no principal/subsidiary flag; treated as subsidiary",
            r.subject_code
        ),
    }
}
