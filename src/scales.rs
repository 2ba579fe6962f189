use crate::calc::CalcError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Curriculum {
    #[serde(rename = "O-Level")]
    OLevel,
    #[serde(rename = "A-Level")]
    ALevel,
}

impl Curriculum {
    pub const ALL: [Curriculum; 2] = [Curriculum::OLevel, Curriculum::ALevel];

    pub fn parse(raw: &str) -> Result<Self, CalcError> {
        let key: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "olevel" | "o" => Ok(Curriculum::OLevel),
            "alevel" | "a" => Ok(Curriculum::ALevel),
            _ => Err(CalcError::new(
                "unknown_curriculum",
                format!("unknown curriculum: {}", raw.trim()),
            )
            .with_details(json!({ "allowed": ["O-Level", "A-Level"] }))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Curriculum::OLevel => "O-Level",
            Curriculum::ALevel => "A-Level",
        }
    }
}

impl TryFrom<String> for Curriculum {
    type Error = CalcError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Curriculum::parse(&value)
    }
}

impl fmt::Display for Curriculum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a grade scale. Both mark bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBand {
    pub grade: String,
    pub min_marks: u32,
    pub max_marks: u32,
    pub points: u32,
}

/// One row of a division scale. `max_points = None` marks the open-ended last band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DivisionBand {
    pub division: String,
    pub min_points: u32,
    #[serde(default)]
    pub max_points: Option<u32>,
}

impl DivisionBand {
    pub fn contains(&self, points: u32) -> bool {
        points >= self.min_points && self.max_points.map(|m| points <= m).unwrap_or(true)
    }
}

/// Which results compete for the best-N slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPool {
    /// Every result with a valid grade.
    All,
    /// Only results flagged as principal subjects.
    Principal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRule {
    pub pool: SelectionPool,
    pub best_count: usize,
}

/// Everything the engine needs to know about one curriculum. Adding a
/// curriculum means adding one of these tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumRules {
    pub curriculum: Curriculum,
    pub grades: Vec<GradeBand>,
    pub divisions: Vec<DivisionBand>,
    pub selection: SelectionRule,
    #[serde(default)]
    pub core_subjects: Vec<String>,
    #[serde(default)]
    pub min_subsidiaries: usize,
    pub passing_grades: Vec<String>,
    #[serde(default)]
    pub subsidiary_passing_grades: Option<Vec<String>>,
    pub passing_divisions: Vec<String>,
}

impl CurriculumRules {
    pub fn o_level() -> Self {
        Self {
            curriculum: Curriculum::OLevel,
            grades: vec![
                grade_band("A", 75, 100, 1),
                grade_band("B", 65, 74, 2),
                grade_band("C", 45, 64, 3),
                grade_band("D", 30, 44, 4),
                grade_band("F", 0, 29, 5),
            ],
            divisions: vec![
                division_band("I", 7, Some(17)),
                division_band("II", 18, Some(21)),
                division_band("III", 22, Some(25)),
                division_band("IV", 26, Some(33)),
                division_band("0", 34, None),
            ],
            selection: SelectionRule {
                pool: SelectionPool::All,
                best_count: 7,
            },
            core_subjects: strings(&["ENG", "MATH", "KISW"]),
            min_subsidiaries: 0,
            passing_grades: strings(&["A", "B", "C", "D"]),
            subsidiary_passing_grades: None,
            passing_divisions: strings(&["I", "II", "III"]),
        }
    }

    pub fn a_level() -> Self {
        Self {
            curriculum: Curriculum::ALevel,
            grades: vec![
                grade_band("A", 80, 100, 1),
                grade_band("B", 70, 79, 2),
                grade_band("C", 60, 69, 3),
                grade_band("D", 50, 59, 4),
                grade_band("E", 40, 49, 5),
                grade_band("S", 35, 39, 6),
                grade_band("F", 0, 34, 7),
            ],
            divisions: vec![
                division_band("I", 3, Some(9)),
                division_band("II", 10, Some(12)),
                division_band("III", 13, Some(17)),
                division_band("IV", 18, Some(19)),
                division_band("0", 20, None),
            ],
            selection: SelectionRule {
                pool: SelectionPool::Principal,
                best_count: 3,
            },
            core_subjects: Vec::new(),
            min_subsidiaries: 2,
            passing_grades: strings(&["A", "B", "C", "D", "E"]),
            subsidiary_passing_grades: Some(strings(&["A", "B", "C", "D", "E", "S"])),
            passing_divisions: strings(&["I", "II", "III"]),
        }
    }

    pub fn for_curriculum(curriculum: Curriculum) -> Self {
        match curriculum {
            Curriculum::OLevel => Self::o_level(),
            Curriculum::ALevel => Self::a_level(),
        }
    }

    pub fn uses_principal_flag(&self) -> bool {
        self.selection.pool == SelectionPool::Principal
    }

    pub fn subsidiary_passing(&self) -> &[String] {
        self.subsidiary_passing_grades
            .as_deref()
            .unwrap_or(&self.passing_grades)
    }

    pub fn is_passing_division(&self, division: &str) -> bool {
        self.passing_divisions.iter().any(|d| d == division)
    }

    /// Position of a division in the scale (0 = best). `None` for "N/A" or unknown labels.
    pub fn division_order(&self, division: &str) -> Option<usize> {
        let mut sorted: Vec<&DivisionBand> = self.divisions.iter().collect();
        sorted.sort_by_key(|b| b.min_points);
        sorted.iter().position(|b| b.division == division)
    }

    /// Grade labels from best to worst.
    pub fn grade_labels(&self) -> Vec<String> {
        let mut sorted: Vec<&GradeBand> = self.grades.iter().collect();
        sorted.sort_by_key(|b| b.points);
        sorted.into_iter().map(|b| b.grade.clone()).collect()
    }

    /// Division labels from best to worst.
    pub fn division_labels(&self) -> Vec<String> {
        let mut sorted: Vec<&DivisionBand> = self.divisions.iter().collect();
        sorted.sort_by_key(|b| b.min_points);
        sorted.into_iter().map(|b| b.division.clone()).collect()
    }

    pub fn validate(&self) -> Result<(), CalcError> {
        validate_grade_scale(self.curriculum, &self.grades)?;
        validate_division_scale(self.curriculum, &self.divisions)?;

        if self.selection.best_count == 0 {
            return Err(scale_defect(
                self.curriculum,
                "selection.bestCount must be at least 1",
            ));
        }

        let grades: HashSet<&str> = self.grades.iter().map(|b| b.grade.as_str()).collect();
        let passing_sets = std::iter::once(&self.passing_grades)
            .chain(self.subsidiary_passing_grades.as_ref());
        for set in passing_sets {
            if let Some(unknown) = set.iter().find(|g| !grades.contains(g.as_str())) {
                return Err(scale_defect(
                    self.curriculum,
                    format!("passing grade {} is not on the grade scale", unknown),
                ));
            }
        }

        let divisions: HashSet<&str> = self
            .divisions
            .iter()
            .map(|b| b.division.as_str())
            .collect();
        if let Some(unknown) = self
            .passing_divisions
            .iter()
            .find(|d| !divisions.contains(d.as_str()))
        {
            return Err(scale_defect(
                self.curriculum,
                format!("passing division {} is not on the division scale", unknown),
            ));
        }
        Ok(())
    }
}

fn grade_band(grade: &str, min_marks: u32, max_marks: u32, points: u32) -> GradeBand {
    GradeBand {
        grade: grade.to_string(),
        min_marks,
        max_marks,
        points,
    }
}

fn division_band(division: &str, min_points: u32, max_points: Option<u32>) -> DivisionBand {
    DivisionBand {
        division: division.to_string(),
        min_points,
        max_points,
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn scale_defect(curriculum: Curriculum, message: impl Into<String>) -> CalcError {
    CalcError::new("scale_defect", message).with_details(json!({ "curriculum": curriculum }))
}

/// Grade bands must cover 0..=100 exactly once.
pub fn validate_grade_scale(curriculum: Curriculum, bands: &[GradeBand]) -> Result<(), CalcError> {
    if bands.is_empty() {
        return Err(scale_defect(curriculum, "grade scale is empty"));
    }
    let mut seen = HashSet::new();
    for b in bands {
        if b.min_marks > b.max_marks {
            return Err(scale_defect(
                curriculum,
                format!("grade {} has min {} above max {}", b.grade, b.min_marks, b.max_marks),
            ));
        }
        if !seen.insert(b.grade.as_str()) {
            return Err(scale_defect(
                curriculum,
                format!("grade {} appears more than once", b.grade),
            ));
        }
    }

    let mut sorted: Vec<&GradeBand> = bands.iter().collect();
    sorted.sort_by_key(|b| b.min_marks);
    if sorted[0].min_marks != 0 {
        return Err(scale_defect(
            curriculum,
            format!("grade scale starts at {} instead of 0", sorted[0].min_marks),
        ));
    }
    for pair in sorted.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if hi.min_marks <= lo.max_marks {
            return Err(scale_defect(
                curriculum,
                format!("grades {} and {} overlap", lo.grade, hi.grade),
            ));
        }
        if hi.min_marks != lo.max_marks + 1 {
            return Err(scale_defect(
                curriculum,
                format!(
                    "gap between grades {} and {} ({}..{})",
                    lo.grade,
                    hi.grade,
                    lo.max_marks + 1,
                    hi.min_marks - 1
                ),
            ));
        }
    }
    let last = sorted[sorted.len() - 1];
    if last.max_marks != 100 {
        return Err(scale_defect(
            curriculum,
            format!("grade scale ends at {} instead of 100", last.max_marks),
        ));
    }
    Ok(())
}

/// Division bands must be contiguous upward from the first minimum, with only the
/// last band open-ended.
pub fn validate_division_scale(
    curriculum: Curriculum,
    bands: &[DivisionBand],
) -> Result<(), CalcError> {
    if bands.is_empty() {
        return Err(scale_defect(curriculum, "division scale is empty"));
    }
    let mut seen = HashSet::new();
    for b in bands {
        if let Some(max) = b.max_points {
            if b.min_points > max {
                return Err(scale_defect(
                    curriculum,
                    format!(
                        "division {} has min {} above max {}",
                        b.division, b.min_points, max
                    ),
                ));
            }
        }
        if !seen.insert(b.division.as_str()) {
            return Err(scale_defect(
                curriculum,
                format!("division {} appears more than once", b.division),
            ));
        }
    }

    let mut sorted: Vec<&DivisionBand> = bands.iter().collect();
    sorted.sort_by_key(|b| b.min_points);
    for pair in sorted.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        let Some(lo_max) = lo.max_points else {
            return Err(scale_defect(
                curriculum,
                format!("only the last division may be open-ended, not {}", lo.division),
            ));
        };
        if hi.min_points <= lo_max {
            return Err(scale_defect(
                curriculum,
                format!("divisions {} and {} overlap", lo.division, hi.division),
            ));
        }
        if hi.min_points != lo_max + 1 {
            return Err(scale_defect(
                curriculum,
                format!("gap between divisions {} and {}", lo.division, hi.division),
            ));
        }
    }
    if sorted[sorted.len() - 1].max_points.is_some() {
        return Err(scale_defect(
            curriculum,
            "the last division must be open-ended",
        ));
    }
    Ok(())
}
