use crate::calc::{grade_results, CalcError, Metric, Warning};
use crate::model::{GradedResult, SubjectResult};
use crate::scales::CurriculumRules;
use crate::selection::missing_principal_flag;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectPerformanceSummary {
    pub subject_id: String,
    pub subject_code: String,
    pub registered_count: usize,
    pub grade_counts: BTreeMap<String, usize>,
    pub passed_count: usize,
    pub pass_rate: Metric,
    pub gpa: Metric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectPerformance {
    pub subjects: BTreeMap<String, SubjectPerformanceSummary>,
    pub warnings: Vec<Warning>,
}

/// Per-subject grade distribution, pass count and GPA over a class's results.
/// Marks that could not be graded are left out of the counts and reported in
/// `warnings`.
pub fn aggregate_subject_performance(
    results: &[SubjectResult],
    rules: &CurriculumRules,
) -> Result<SubjectPerformance, CalcError> {
    let (graded, mut warnings) = grade_results(results, rules)?;
    let mut performance = aggregate_graded(&graded, rules);
    warnings.append(&mut performance.warnings);
    performance.warnings = warnings;
    Ok(performance)
}

pub fn aggregate_graded(graded: &[GradedResult], rules: &CurriculumRules) -> SubjectPerformance {
    let mut by_subject: BTreeMap<&str, Vec<&GradedResult>> = BTreeMap::new();
    for r in graded {
        by_subject.entry(r.subject_id.as_str()).or_default().push(r);
    }

    let mut warnings = Vec::new();
    let mut subjects = BTreeMap::new();
    for (subject_id, rows) in by_subject {
        let mut grade_counts: BTreeMap<String, usize> = rules
            .grades
            .iter()
            .map(|b| (b.grade.clone(), 0))
            .collect();
        let mut registered = 0_usize;
        let mut passed = 0_usize;
        let mut points_sum = 0_u64;

        for r in rows.iter().filter(|r| r.is_graded()) {
            registered += 1;
            points_sum += u64::from(r.points);
            *grade_counts.entry(r.grade.clone()).or_insert(0) += 1;

            let passing = if rules.uses_principal_flag() {
                match r.is_principal {
                    Some(true) => rules.passing_grades.as_slice(),
                    Some(false) => rules.subsidiary_passing(),
                    None => {
                        warnings.push(missing_principal_flag(r));
                        rules.subsidiary_passing()
                    }
                }
            } else {
                rules.passing_grades.as_slice()
            };
            if passing.iter().any(|g| *g == r.grade) {
                passed += 1;
            }
        }

        subjects.insert(
            subject_id.to_string(),
            SubjectPerformanceSummary {
                subject_id: subject_id.to_string(),
                subject_code: rows[0].subject_code.clone(),
                registered_count: registered,
                grade_counts,
                passed_count: passed,
                pass_rate: Metric::percent(passed, registered),
                gpa: Metric::mean(points_sum as f64, registered),
            },
        );
    }

    SubjectPerformance { subjects, warnings }
}
