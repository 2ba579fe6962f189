use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Marks as they arrive from storage: missing, numeric, or something that could
/// not be read as a number.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MarksEntry {
    #[default]
    Absent,
    Value(f64),
    Invalid(String),
}

impl MarksEntry {
    pub fn value(&self) -> Option<f64> {
        match self {
            MarksEntry::Value(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<Option<f64>> for MarksEntry {
    fn from(value: Option<f64>) -> Self {
        value.map(MarksEntry::Value).unwrap_or(MarksEntry::Absent)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMarks {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl From<Option<RawMarks>> for MarksEntry {
    fn from(raw: Option<RawMarks>) -> Self {
        match raw {
            None => MarksEntry::Absent,
            Some(RawMarks::Number(v)) => MarksEntry::Value(v),
            Some(RawMarks::Text(s)) => {
                let t = s.trim();
                if t.is_empty() {
                    MarksEntry::Absent
                } else {
                    t.parse::<f64>()
                        .map(MarksEntry::Value)
                        .unwrap_or_else(|_| MarksEntry::Invalid(t.to_string()))
                }
            }
            Some(RawMarks::Other(v)) => MarksEntry::Invalid(v.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for MarksEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<RawMarks>::deserialize(deserializer).map(MarksEntry::from)
    }
}

impl Serialize for MarksEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            MarksEntry::Absent => serializer.serialize_none(),
            MarksEntry::Value(v) => serializer.serialize_f64(*v),
            MarksEntry::Invalid(raw) => serializer.serialize_str(raw),
        }
    }
}

/// One student's outcome in one subject, normalized once at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResult {
    pub subject_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_code: Option<String>,
    #[serde(default)]
    pub student_id: String,
    #[serde(default, alias = "marks")]
    pub marks_obtained: MarksEntry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_principal: Option<bool>,
}

impl SubjectResult {
    pub fn new(student_id: &str, subject_id: &str, marks: Option<f64>) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            subject_code: None,
            student_id: student_id.to_string(),
            marks_obtained: marks.into(),
            is_principal: None,
        }
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.subject_code = Some(code.to_string());
        self
    }

    pub fn principal(mut self, is_principal: bool) -> Self {
        self.is_principal = Some(is_principal);
        self
    }

    /// Subject code, falling back to the id when none was supplied.
    pub fn code(&self) -> &str {
        self.subject_code
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(&self.subject_id)
    }
}

/// A `SubjectResult` with its grade and points resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedResult {
    pub subject_id: String,
    pub subject_code: String,
    pub student_id: String,
    pub marks_obtained: MarksEntry,
    pub grade: String,
    pub points: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_principal: Option<bool>,
}

impl GradedResult {
    pub fn is_graded(&self) -> bool {
        self.grade != crate::calc::NOT_AVAILABLE
    }
}

/// A roster entry handed to the report builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentResults {
    pub student_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub results: Vec<SubjectResult>,
}

impl StudentResults {
    /// Results with the student id filled in where the caller left it blank.
    pub fn normalized_results(&self) -> Vec<SubjectResult> {
        self.results
            .iter()
            .map(|r| {
                let mut r = r.clone();
                if r.student_id.trim().is_empty() {
                    r.student_id = self.student_id.clone();
                }
                r
            })
            .collect()
    }
}
