use crate::ipc::error::{calc_err, err, ok};
use crate::ipc::types::Request;
use gradebook::catalog::SubjectCatalog;
use gradebook::{CurriculumRules, GradingConfig, SubjectResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// Optional param; missing and null both mean `None`.
pub fn optional_param<T: DeserializeOwned>(
    req: &Request,
    key: &str,
) -> Result<Option<T>, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => serde_json::from_value(v.clone()).map(Some).map_err(|e| {
            err(
                &req.id,
                "bad_params",
                format!("invalid {}: {}", key, e),
                None,
            )
        }),
    }
}

pub fn required_param<T: DeserializeOwned>(
    req: &Request,
    key: &str,
) -> Result<T, serde_json::Value> {
    optional_param(req, key)?
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn curriculum_rules<'a>(
    config: &'a GradingConfig,
    req: &Request,
) -> Result<&'a CurriculumRules, serde_json::Value> {
    let raw = required_str(req, "curriculum")?;
    config.rules_for(&raw).map_err(|e| calc_err(&req.id, e))
}

/// Fills subject code / principal flag from the catalog before the engine runs.
pub fn fill_subject_metadata(
    catalog: &mut SubjectCatalog,
    req: &Request,
    results: &mut [SubjectResult],
) -> Result<(), serde_json::Value> {
    for r in results.iter_mut() {
        if let Err(e) = catalog.fill_metadata(r) {
            tracing::warn!(error = %format!("{e:#}"), "subject catalog lookup failed");
            return Err(err(
                &req.id,
                "catalog_unavailable",
                format!("{e:#}"),
                Some(json!({ "subjectId": r.subject_id })),
            ));
        }
    }
    Ok(())
}

pub fn to_result<T: Serialize>(req: &Request, value: &T) -> Result<serde_json::Value, serde_json::Value> {
    serde_json::to_value(value).map_err(|e| err(&req.id, "internal", e.to_string(), None))
}

pub fn respond(
    req: &Request,
    outcome: Result<serde_json::Value, serde_json::Value>,
) -> serde_json::Value {
    match outcome {
        Ok(result) => ok(&req.id, result),
        Err(resp) => resp,
    }
}
