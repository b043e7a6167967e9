use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({ "comments": state.store.current().canned_comments }),
    )
}

fn handle_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let text = match required_str(req, "text") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if text.trim().is_empty() {
        return err(&req.id, "bad_params", "text must be non-empty", None);
    }
    let mut next = state.store.current().clone();
    next.canned_comments.push(text);
    let revision = state.store.commit(next);
    ok(
        &req.id,
        json!({
            "revision": revision,
            "comments": state.store.current().canned_comments,
        }),
    )
}

fn handle_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(index) = req.params.get("index").and_then(|v| v.as_u64()) else {
        return err(&req.id, "bad_params", "missing index", None);
    };
    let index = index as usize;
    let mut next = state.store.current().clone();
    if index >= next.canned_comments.len() {
        return err(
            &req.id,
            "not_found",
            format!("no canned comment at index {}", index),
            None,
        );
    }
    next.canned_comments.remove(index);
    let revision = state.store.commit(next);
    ok(
        &req.id,
        json!({
            "revision": revision,
            "comments": state.store.current().canned_comments,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "comments.list" => Some(handle_list(state, req)),
        "comments.add" => Some(handle_add(state, req)),
        "comments.remove" => Some(handle_remove(state, req)),
        _ => None,
    }
}
