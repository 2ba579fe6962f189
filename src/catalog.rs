use crate::model::SubjectResult;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectInfo {
    pub id: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_principal: Option<bool>,
}

/// Where subject metadata comes from. Implementations may be slow; callers go
/// through [`SubjectCatalog`].
pub trait SubjectSource {
    fn fetch(&self, subject_id: &str) -> anyhow::Result<Option<SubjectInfo>>;

    fn describe(&self) -> String;
}

pub struct StaticSubjectSource {
    subjects: HashMap<String, SubjectInfo>,
}

impl StaticSubjectSource {
    pub fn new(subjects: Vec<SubjectInfo>) -> Self {
        Self {
            subjects: subjects.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }
}

impl SubjectSource for StaticSubjectSource {
    fn fetch(&self, subject_id: &str) -> anyhow::Result<Option<SubjectInfo>> {
        Ok(self.subjects.get(subject_id).cloned())
    }

    fn describe(&self) -> String {
        format!("static ({} subjects)", self.subjects.len())
    }
}

/// Reads a JSON array of subjects from disk on every fetch.
pub struct JsonFileSubjectSource {
    path: PathBuf,
}

impl JsonFileSubjectSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SubjectSource for JsonFileSubjectSource {
    fn fetch(&self, subject_id: &str) -> anyhow::Result<Option<SubjectInfo>> {
        let text = std::fs::read_to_string(&self.path).with_context(|| {
            format!("failed to read subjects file {}", self.path.to_string_lossy())
        })?;
        let subjects: Vec<SubjectInfo> = serde_json::from_str(&text).with_context(|| {
            format!("failed to parse subjects file {}", self.path.to_string_lossy())
        })?;
        Ok(subjects.into_iter().find(|s| s.id == subject_id))
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.to_string_lossy())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub cached: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Read-through cache over a [`SubjectSource`]. Misses are cached too, so an
/// unknown id is looked up once until it is invalidated.
pub struct SubjectCatalog {
    source: Box<dyn SubjectSource>,
    entries: HashMap<String, Option<SubjectInfo>>,
    hits: u64,
    misses: u64,
}

impl SubjectCatalog {
    pub fn new(source: Box<dyn SubjectSource>) -> Self {
        Self {
            source,
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn source_description(&self) -> String {
        self.source.describe()
    }

    pub fn get(&mut self, subject_id: &str) -> anyhow::Result<Option<SubjectInfo>> {
        if let Some(entry) = self.entries.get(subject_id) {
            self.hits += 1;
            return Ok(entry.clone());
        }
        self.misses += 1;
        let fetched = self.source.fetch(subject_id)?;
        tracing::debug!(subject_id, found = fetched.is_some(), "subject cache miss");
        self.entries.insert(subject_id.to_string(), fetched.clone());
        Ok(fetched)
    }

    /// Drops one cached entry. Returns whether anything was cached for it.
    pub fn invalidate(&mut self, subject_id: &str) -> bool {
        self.entries.remove(subject_id).is_some()
    }

    /// Drops every cached entry and returns how many there were.
    pub fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            cached: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }

    /// Fills subject code and principal flag where the caller left them out.
    /// Values the caller did supply always win.
    pub fn fill_metadata(&mut self, result: &mut SubjectResult) -> anyhow::Result<()> {
        let needs_code = result
            .subject_code
            .as_deref()
            .map(|c| c.trim().is_empty())
            .unwrap_or(true);
        if !needs_code && result.is_principal.is_some() {
            return Ok(());
        }
        let Some(info) = self.get(&result.subject_id)? else {
            return Ok(());
        };
        if needs_code {
            result.subject_code = Some(info.code);
        }
        if result.is_principal.is_none() {
            result.is_principal = info.is_principal;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingSource {
        calls: Rc<Cell<usize>>,
        inner: StaticSubjectSource,
    }

    impl SubjectSource for CountingSource {
        fn fetch(&self, subject_id: &str) -> anyhow::Result<Option<SubjectInfo>> {
            self.calls.set(self.calls.get() + 1);
            self.inner.fetch(subject_id)
        }

        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    fn subject(id: &str, code: &str, principal: Option<bool>) -> SubjectInfo {
        SubjectInfo {
            id: id.to_string(),
            code: code.to_string(),
            name: None,
            is_principal: principal,
        }
    }

    fn counting_catalog() -> (SubjectCatalog, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let source = CountingSource {
            calls: calls.clone(),
            inner: StaticSubjectSource::new(vec![
                subject("1", "PHY", Some(true)),
                subject("2", "GS", Some(false)),
            ]),
        };
        (SubjectCatalog::new(Box::new(source)), calls)
    }

    #[test]
    fn reads_through_once_until_invalidated() {
        let (mut catalog, calls) = counting_catalog();
        assert_eq!(catalog.get("1").unwrap().unwrap().code, "PHY");
        assert_eq!(catalog.get("1").unwrap().unwrap().code, "PHY");
        assert_eq!(calls.get(), 1);

        assert!(catalog.get("missing").unwrap().is_none());
        assert!(catalog.get("missing").unwrap().is_none());
        assert_eq!(calls.get(), 2);

        assert!(catalog.invalidate("1"));
        assert!(!catalog.invalidate("1"));
        catalog.get("1").unwrap();
        assert_eq!(calls.get(), 3);

        assert_eq!(catalog.clear(), 2);
        assert_eq!(catalog.stats().cached, 0);
        assert_eq!(catalog.stats().hits, 2);
    }

    #[test]
    fn fill_metadata_keeps_caller_values() {
        let (mut catalog, calls) = counting_catalog();
        let mut r = SubjectResult::new("s1", "1", Some(50.0));
        catalog.fill_metadata(&mut r).unwrap();
        assert_eq!(r.subject_code.as_deref(), Some("PHY"));
        assert_eq!(r.is_principal, Some(true));

        let mut r = SubjectResult::new("s1", "2", Some(50.0))
            .with_code("GENSTUD")
            .principal(true);
        catalog.fill_metadata(&mut r).unwrap();
        assert_eq!(r.subject_code.as_deref(), Some("GENSTUD"));
        assert_eq!(r.is_principal, Some(true));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn file_source_reports_missing_file() {
        let source = JsonFileSubjectSource::new("/definitely/not/here/subjects.json");
        let err = source.fetch("1").unwrap_err();
        assert!(format!("{err:#}").contains("failed to read subjects file"));
    }
}
