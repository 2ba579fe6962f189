use crate::ipc::error::{calc_err, ok};
use crate::ipc::helpers::to_result;
use crate::ipc::types::{AppState, Request};
use gradebook::Curriculum;
use serde_json::json;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let curricula: Vec<Curriculum> = state.config.curricula.iter().map(|r| r.curriculum).collect();
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "curricula": curricula,
            "assessmentScope": state.config.assessment_scope,
            "subjectSource": state.catalog.source_description(),
            "subjectCache": state.catalog.stats(),
        }),
    )
}

fn handle_config_scales(state: &mut AppState, req: &Request) -> serde_json::Value {
    let filter = req
        .params
        .get("curriculum")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let curricula = match filter {
        None => state.config.curricula.iter().collect::<Vec<_>>(),
        Some(raw) => match state.config.rules_for(&raw) {
            Ok(rules) => vec![rules],
            Err(e) => return calc_err(&req.id, e),
        },
    };
    match to_result(req, &curricula) {
        Ok(v) => ok(&req.id, json!({ "curricula": v })),
        Err(resp) => resp,
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "config.scales" => Some(handle_config_scales(state, req)),
        _ => None,
    }
}
