use crate::calc::CalcError;
use crate::catalog::{JsonFileSubjectSource, StaticSubjectSource, SubjectInfo, SubjectSource};
use crate::scales::{Curriculum, CurriculumRules};
use crate::weightage::ScopeRule;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV: &str = "GRADEBOOKD_CONFIG";

/// Scales, selection rules and subject metadata. Built once at start-up and
/// never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GradingConfig {
    pub curricula: Vec<CurriculumRules>,
    pub assessment_scope: ScopeRule,
    pub subjects: Vec<SubjectInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subjects_file: Option<PathBuf>,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            curricula: Curriculum::ALL
                .iter()
                .map(|c| CurriculumRules::for_curriculum(*c))
                .collect(),
            assessment_scope: ScopeRule::default(),
            subjects: Vec::new(),
            subjects_file: None,
        }
    }
}

impl GradingConfig {
    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        let cfg: GradingConfig = serde_json::from_str(text).context("invalid config json")?;
        cfg.validate().context("invalid grading scales")?;
        Ok(cfg)
    }

    /// Loads a config file. A relative `subjectsFile` resolves against the
    /// config file's directory.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.to_string_lossy()))?;
        let mut cfg = Self::from_json_str(&text)
            .with_context(|| format!("failed to load config {}", path.to_string_lossy()))?;
        if let (Some(file), Some(dir)) = (cfg.subjects_file.as_ref(), path.parent()) {
            if file.is_relative() {
                cfg.subjects_file = Some(dir.join(file));
            }
        }
        Ok(cfg)
    }

    /// `.env` first, then `GRADEBOOKD_CONFIG` if set, else the built-in tables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        match std::env::var(CONFIG_ENV) {
            Ok(p) if !p.trim().is_empty() => Self::load(Path::new(p.trim())),
            _ => {
                let cfg = Self::default();
                cfg.validate().context("invalid built-in grading scales")?;
                Ok(cfg)
            }
        }
    }

    pub fn validate(&self) -> Result<(), CalcError> {
        let mut seen = HashSet::new();
        for rules in &self.curricula {
            if !seen.insert(rules.curriculum) {
                return Err(CalcError::new(
                    "scale_defect",
                    format!("curriculum {} is configured twice", rules.curriculum),
                ));
            }
            rules.validate()?;
        }
        Ok(())
    }

    pub fn rules(&self, curriculum: Curriculum) -> Result<&CurriculumRules, CalcError> {
        self.curricula
            .iter()
            .find(|r| r.curriculum == curriculum)
            .ok_or_else(|| {
                CalcError::new(
                    "unknown_curriculum",
                    format!("curriculum {} is not configured", curriculum),
                )
                .with_details(json!({
                    "configured": self.curricula.iter().map(|r| r.curriculum).collect::<Vec<_>>()
                }))
            })
    }

    /// Parses a curriculum name and returns its rules.
    pub fn rules_for(&self, raw: &str) -> Result<&CurriculumRules, CalcError> {
        self.rules(Curriculum::parse(raw)?)
    }

    pub fn subject_source(&self) -> Box<dyn SubjectSource> {
        match &self.subjects_file {
            Some(path) => Box::new(JsonFileSubjectSource::new(path.clone())),
            None => Box::new(StaticSubjectSource::new(self.subjects.clone())),
        }
    }
}
