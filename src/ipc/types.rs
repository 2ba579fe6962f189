use gradebook::catalog::SubjectCatalog;
use gradebook::GradingConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: GradingConfig,
    pub catalog: SubjectCatalog,
}

impl AppState {
    pub fn new(config: GradingConfig) -> Self {
        let catalog = SubjectCatalog::new(config.subject_source());
        Self { config, catalog }
    }
}
