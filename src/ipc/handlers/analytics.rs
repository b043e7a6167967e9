use crate::calc;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

fn handle_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let summary = calc::summarize(state.store.current());
    match serde_json::to_value(&summary) {
        Ok(v) => ok(&req.id, v),
        Err(e) => err(&req.id, "internal", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "analytics.summary" => Some(handle_summary(state, req)),
        _ => None,
    }
}
