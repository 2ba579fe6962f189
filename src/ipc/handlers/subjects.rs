use crate::ipc::error::err;
use crate::ipc::helpers::{optional_param, required_str, respond};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn run_subjects_get(state: &mut AppState, req: &Request) -> Result<serde_json::Value, serde_json::Value> {
    let subject_id = required_str(req, "subjectId")?;
    let subject = state
        .catalog
        .get(&subject_id)
        .map_err(|e| err(&req.id, "catalog_unavailable", format!("{e:#}"), None))?;
    Ok(json!({
        "subject": subject,
        "cache": state.catalog.stats(),
    }))
}

fn run_subjects_cache_clear(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, serde_json::Value> {
    let subject_id: Option<String> = optional_param(req, "subjectId")?;
    let cleared = match subject_id.as_deref() {
        Some(id) => usize::from(state.catalog.invalidate(id)),
        None => state.catalog.clear(),
    };
    tracing::info!(cleared, subject_id = subject_id.as_deref().unwrap_or("*"), "subject cache cleared");
    Ok(json!({
        "cleared": cleared,
        "cache": state.catalog.stats(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "subjects.get" => Some(respond(req, run_subjects_get(state, req))),
        "subjects.cacheClear" => Some(respond(req, run_subjects_cache_clear(state, req))),
        _ => None,
    }
}
