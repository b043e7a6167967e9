use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::opt_str;
use crate::ipc::types::{AppState, Request};
use crate::store::AssessmentStatus;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let assessment = state.store.current();
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "revision": state.store.revision(),
            "status": assessment.status,
            "rubricItems": assessment.rubric.len(),
            "students": assessment.students.len(),
        }),
    )
}

fn handle_assessment_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let assessment = match serde_json::to_value(state.store.current()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "internal", e.to_string(), None),
    };
    ok(
        &req.id,
        json!({
            "assessment": assessment,
            "revision": state.store.revision(),
        }),
    )
}

fn handle_assessment_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let status = match req.params.get("status") {
        None => None,
        Some(raw) => match serde_json::from_value::<AssessmentStatus>(raw.clone()) {
            Ok(s) => Some(s),
            Err(_) => {
                return err(
                    &req.id,
                    "bad_params",
                    "status must be one of: draft, ready, grading, completed",
                    None,
                )
            }
        },
    };

    let mut next = state.store.current().clone();
    if let Some(title) = opt_str(req, "title") {
        next.title = title;
    }
    if let Some(description) = opt_str(req, "description") {
        next.description = description;
    }
    if let Some(status) = status {
        next.status = status;
    }
    let revision = state.store.commit(next);
    ok(
        &req.id,
        json!({
            "revision": revision,
            "status": state.store.current().status,
            "title": state.store.current().title,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "assessment.get" => Some(handle_assessment_get(state, req)),
        "assessment.update" => Some(handle_assessment_update(state, req)),
        _ => None,
    }
}
