use crate::calc::{grade_results, CalcError, Metric, Warning, NOT_AVAILABLE};
use crate::model::{GradedResult, StudentResults};
use crate::performance::{aggregate_graded, SubjectPerformanceSummary};
use crate::scales::{Curriculum, CurriculumRules};
use crate::selection::{select_from_graded, BestSubjectSelection};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    Rank,
    TotalPoints,
    Division,
    StudentId,
    Name,
    AverageMarks,
}

impl SortField {
    pub const ALL: [SortField; 6] = [
        SortField::Rank,
        SortField::TotalPoints,
        SortField::Division,
        SortField::StudentId,
        SortField::Name,
        SortField::AverageMarks,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Rank => "rank",
            SortField::TotalPoints => "totalPoints",
            SortField::Division => "division",
            SortField::StudentId => "studentId",
            SortField::Name => "name",
            SortField::AverageMarks => "averageMarks",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().eq_ignore_ascii_case("asc") {
            Some(SortDirection::Asc)
        } else if raw.trim().eq_ignore_ascii_case("desc") {
            Some(SortDirection::Desc)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReport {
    pub student_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub results: Vec<GradedResult>,
    pub selection: BestSubjectSelection,
    pub average_marks: Metric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedStudent {
    #[serde(flatten)]
    pub report: StudentReport,
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallPerformance {
    pub student_count: usize,
    pub total_passed: usize,
    pub pass_rate: Metric,
    pub exam_gpa: Metric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassReport {
    pub curriculum: Curriculum,
    pub generated_at: DateTime<Utc>,
    pub sort_by: SortField,
    pub sort_dir: SortDirection,
    pub students: Vec<RankedStudent>,
    pub division_summary: BTreeMap<String, usize>,
    pub subject_performance: BTreeMap<String, SubjectPerformanceSummary>,
    pub overall_performance: OverallPerformance,
    pub warnings: Vec<Warning>,
}

/// Grades one student's results and selects their best subjects.
pub fn build_student_report(
    student: &StudentResults,
    rules: &CurriculumRules,
) -> Result<StudentReport, CalcError> {
    let (results, warnings) = grade_results(&student.normalized_results(), rules)?;
    let selection = select_from_graded(&results, warnings, rules)?;

    let marks: Vec<f64> = results
        .iter()
        .filter(|r| r.is_graded())
        .filter_map(|r| r.marks_obtained.value())
        .collect();
    let average_marks = Metric::mean(marks.iter().sum(), marks.len());

    Ok(StudentReport {
        student_id: student.student_id.clone(),
        name: student.name.clone(),
        results,
        selection,
        average_marks,
    })
}

/// Builds the full class report: per-student selections, performance ranks,
/// division tallies, subject statistics and overall figures.
///
/// `rank` follows division, then total points (lower is better, roster order
/// on ties, students without any gradable subject last). For complete records
/// that is plain points order; an incomplete record with a small total sits in
/// the worst division and ranks with it. `sort_by` only changes the order rows
/// are returned in.
pub fn build_class_report(
    students: &[StudentResults],
    rules: &CurriculumRules,
    sort_by: SortField,
    sort_dir: SortDirection,
) -> Result<ClassReport, CalcError> {
    let reports = students
        .iter()
        .map(|s| build_student_report(s, rules))
        .collect::<Result<Vec<_>, _>>()?;

    let mut by_performance: Vec<usize> = (0..reports.len()).collect();
    by_performance.sort_by(|&a, &b| {
        let (ra, rb) = (&reports[a].selection, &reports[b].selection);
        (!ra.has_division())
            .cmp(&!rb.has_division())
            .then_with(|| {
                rules
                    .division_order(&ra.division)
                    .cmp(&rules.division_order(&rb.division))
            })
            .then_with(|| ra.total_points.cmp(&rb.total_points))
    });
    let mut ranks = vec![0_usize; reports.len()];
    for (pos, idx) in by_performance.into_iter().enumerate() {
        ranks[idx] = pos + 1;
    }

    let mut division_summary: BTreeMap<String, usize> = rules
        .division_labels()
        .into_iter()
        .chain(std::iter::once(NOT_AVAILABLE.to_string()))
        .map(|d| (d, 0))
        .collect();
    for r in &reports {
        *division_summary
            .entry(r.selection.division.clone())
            .or_insert(0) += 1;
    }

    let all_results: Vec<GradedResult> = reports
        .iter()
        .flat_map(|r| r.results.iter().cloned())
        .collect();
    let performance = aggregate_graded(&all_results, rules);

    let total_passed = reports
        .iter()
        .filter(|r| rules.is_passing_division(&r.selection.division))
        .count();
    let classified: Vec<u32> = reports
        .iter()
        .filter(|r| r.selection.has_division())
        .map(|r| r.selection.total_points)
        .collect();
    let overall_performance = OverallPerformance {
        student_count: reports.len(),
        total_passed,
        pass_rate: Metric::percent(total_passed, reports.len()),
        exam_gpa: Metric::mean(
            classified.iter().map(|p| f64::from(*p)).sum(),
            classified.len(),
        ),
    };

    let mut rows: Vec<RankedStudent> = reports
        .into_iter()
        .zip(ranks)
        .map(|(report, rank)| RankedStudent { report, rank })
        .collect();
    rows.sort_by(|a, b| {
        compare_rows(a, b, sort_by, sort_dir, rules).then_with(|| a.rank.cmp(&b.rank))
    });

    tracing::debug!(
        curriculum = %rules.curriculum,
        students = rows.len(),
        subjects = performance.subjects.len(),
        "class report built"
    );

    Ok(ClassReport {
        curriculum: rules.curriculum,
        generated_at: Utc::now(),
        sort_by,
        sort_dir,
        students: rows,
        division_summary,
        subject_performance: performance.subjects,
        overall_performance,
        warnings: performance.warnings,
    })
}

fn compare_rows(
    a: &RankedStudent,
    b: &RankedStudent,
    field: SortField,
    dir: SortDirection,
    rules: &CurriculumRules,
) -> Ordering {
    let (ra, rb) = (&a.report, &b.report);
    match field {
        SortField::Rank => nulls_last(Some(a.rank), Some(b.rank), dir),
        SortField::TotalPoints => nulls_last(
            Some(ra.selection.total_points).filter(|_| ra.selection.has_division()),
            Some(rb.selection.total_points).filter(|_| rb.selection.has_division()),
            dir,
        ),
        SortField::Division => nulls_last(
            rules.division_order(&ra.selection.division),
            rules.division_order(&rb.selection.division),
            dir,
        ),
        SortField::StudentId => nulls_last(Some(&ra.student_id), Some(&rb.student_id), dir),
        SortField::Name => nulls_last(
            sortable_name(ra.name.as_deref()),
            sortable_name(rb.name.as_deref()),
            dir,
        ),
        SortField::AverageMarks => {
            nulls_last(ra.average_marks.value(), rb.average_marks.value(), dir)
        }
    }
}

fn sortable_name(name: Option<&str>) -> Option<String> {
    name.map(|n| n.trim().to_lowercase()).filter(|n| !n.is_empty())
}

/// Applies `dir` to present values only; missing values go last either way.
fn nulls_last<T: PartialOrd>(a: Option<T>, b: Option<T>, dir: SortDirection) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            match dir {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
