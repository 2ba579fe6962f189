use crate::ipc::error::{calc_err, err};
use crate::ipc::helpers::{
    curriculum_rules, fill_subject_metadata, required_param, respond, to_result,
};
use crate::ipc::types::{AppState, Request};
use gradebook::{build_class_report, build_student_report, SortDirection, SortField, StudentResults};
use serde_json::json;

fn parse_sort_by(req: &Request) -> Result<SortField, serde_json::Value> {
    let Some(value) = req.params.get("sortBy").filter(|v| !v.is_null()) else {
        return Ok(SortField::default());
    };
    let allowed: Vec<&str> = SortField::ALL.iter().map(|f| f.as_str()).collect();
    value
        .as_str()
        .and_then(SortField::parse)
        .ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("sortBy must be one of: {}", allowed.join(", ")),
                Some(json!({ "sortBy": value })),
            )
        })
}

fn parse_sort_dir(req: &Request) -> Result<SortDirection, serde_json::Value> {
    let Some(value) = req.params.get("sortDir").filter(|v| !v.is_null()) else {
        return Ok(SortDirection::default());
    };
    value
        .as_str()
        .and_then(SortDirection::parse)
        .ok_or_else(|| err(&req.id, "bad_params", "sortDir must be one of: asc, desc", None))
}

fn run_reports_class(state: &mut AppState, req: &Request) -> Result<serde_json::Value, serde_json::Value> {
    let mut students: Vec<StudentResults> = required_param(req, "students")?;
    let sort_by = parse_sort_by(req)?;
    let sort_dir = parse_sort_dir(req)?;
    for s in students.iter_mut() {
        fill_subject_metadata(&mut state.catalog, req, &mut s.results)?;
    }
    let rules = curriculum_rules(&state.config, req)?;
    let report =
        build_class_report(&students, rules, sort_by, sort_dir).map_err(|e| calc_err(&req.id, e))?;
    to_result(req, &report)
}

fn run_reports_student(state: &mut AppState, req: &Request) -> Result<serde_json::Value, serde_json::Value> {
    let mut student: StudentResults = required_param(req, "student")?;
    fill_subject_metadata(&mut state.catalog, req, &mut student.results)?;
    let rules = curriculum_rules(&state.config, req)?;
    let report = build_student_report(&student, rules).map_err(|e| calc_err(&req.id, e))?;
    to_result(req, &report)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.class" => Some(respond(req, run_reports_class(state, req))),
        "reports.student" => Some(respond(req, run_reports_student(state, req))),
        _ => None,
    }
}
