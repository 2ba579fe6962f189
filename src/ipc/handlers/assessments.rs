use crate::ipc::helpers::{optional_param, required_param, respond, to_result};
use crate::ipc::types::{AppState, Request};
use gradebook::{allocation_summary, validate_weightage, Assessment, AssessmentScope};

fn run_validate_weightage(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, serde_json::Value> {
    let existing: Vec<Assessment> = optional_param(req, "existing")?.unwrap_or_default();
    let candidate: Assessment = required_param(req, "candidate")?;
    let verdict = validate_weightage(&existing, &candidate, state.config.assessment_scope);
    if !verdict.is_valid {
        tracing::info!(
            candidate = candidate.id.as_deref().unwrap_or("<new>"),
            requested = verdict.requested_percent,
            allocated = verdict.allocated_percent,
            "assessment weightage rejected"
        );
    }
    to_result(req, &verdict)
}

fn run_allocation(state: &mut AppState, req: &Request) -> Result<serde_json::Value, serde_json::Value> {
    let existing: Vec<Assessment> = optional_param(req, "existing")?.unwrap_or_default();
    let scope: AssessmentScope = required_param(req, "scope")?;
    let summary = allocation_summary(&existing, &scope, state.config.assessment_scope);
    to_result(req, &summary)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assessments.validateWeightage" => Some(respond(req, run_validate_weightage(state, req))),
        "assessments.allocation" => Some(respond(req, run_allocation(state, req))),
        _ => None,
    }
}
