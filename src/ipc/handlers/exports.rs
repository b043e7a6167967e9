use serde_json::json;

use crate::calc;
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};

fn handle_grades_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let assessment = state.store.current();
    ok(
        &req.id,
        json!({
            "fileName": calc::csv_file_name(&assessment.title),
            "content": calc::grades_csv(assessment),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "exports.gradesCsv" => Some(handle_grades_csv(state, req)),
        _ => None,
    }
}
