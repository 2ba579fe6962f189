use crate::ipc::error::{calc_err, err};
use crate::ipc::helpers::{
    curriculum_rules, fill_subject_metadata, required_param, respond, to_result,
};
use crate::ipc::types::{AppState, Request};
use gradebook::{
    aggregate_subject_performance, classify_division, resolve_grade, select_best_subjects,
    MarksEntry, SubjectResult,
};
use serde_json::json;

fn parse_total_points(req: &Request) -> Result<Option<u32>, serde_json::Value> {
    let Some(v) = req.params.get("totalPoints").filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    let whole = v.as_u64().or_else(|| {
        v.as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
            .map(|f| f as u64)
    });
    match whole.and_then(|n| u32::try_from(n).ok()) {
        Some(n) => Ok(Some(n)),
        None => Err(err(
            &req.id,
            "bad_params",
            "totalPoints must be a non-negative integer or null",
            Some(json!({ "totalPoints": v })),
        )),
    }
}

fn run_grades_resolve(state: &mut AppState, req: &Request) -> Result<serde_json::Value, serde_json::Value> {
    let rules = curriculum_rules(&state.config, req)?;
    let raw = req.params.get("marks").cloned().unwrap_or(serde_json::Value::Null);
    let marks: MarksEntry = serde_json::from_value(raw)
        .map_err(|e| err(&req.id, "bad_params", format!("invalid marks: {}", e), None))?;
    let outcome = resolve_grade(&marks, rules).map_err(|e| calc_err(&req.id, e))?;
    Ok(json!({
        "curriculum": rules.curriculum,
        "marks": marks,
        "grade": outcome.grade,
        "points": outcome.points,
        "warning": outcome.warning,
    }))
}

fn run_divisions_classify(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, serde_json::Value> {
    let rules = curriculum_rules(&state.config, req)?;
    let total_points = parse_total_points(req)?;
    let outcome = classify_division(total_points, rules).map_err(|e| calc_err(&req.id, e))?;
    Ok(json!({
        "curriculum": rules.curriculum,
        "totalPoints": total_points,
        "division": outcome.division,
        "warning": outcome.warning,
    }))
}

fn run_selection_best(state: &mut AppState, req: &Request) -> Result<serde_json::Value, serde_json::Value> {
    let mut results: Vec<SubjectResult> = required_param(req, "results")?;
    fill_subject_metadata(&mut state.catalog, req, &mut results)?;
    let rules = curriculum_rules(&state.config, req)?;
    let selection = select_best_subjects(&results, rules).map_err(|e| calc_err(&req.id, e))?;
    to_result(req, &selection)
}

fn run_performance_subjects(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, serde_json::Value> {
    let mut results: Vec<SubjectResult> = required_param(req, "results")?;
    fill_subject_metadata(&mut state.catalog, req, &mut results)?;
    let rules = curriculum_rules(&state.config, req)?;
    let performance =
        aggregate_subject_performance(&results, rules).map_err(|e| calc_err(&req.id, e))?;
    to_result(req, &performance)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.resolve" => Some(respond(req, run_grades_resolve(state, req))),
        "divisions.classify" => Some(respond(req, run_divisions_classify(state, req))),
        "selection.best" => Some(respond(req, run_selection_best(state, req))),
        "performance.subjects" => Some(respond(req, run_performance_subjects(state, req))),
        _ => None,
    }
}
