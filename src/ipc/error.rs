use serde_json::json;

use crate::ai::GatewayError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn gateway_err(id: &str, e: GatewayError) -> serde_json::Value {
    err(id, e.code(), e.to_string(), None)
}

pub fn stale_snapshot(id: &str, base: u64, current: u64) -> serde_json::Value {
    err(
        id,
        "stale_snapshot",
        "assessment changed since this operation started",
        Some(json!({ "baseRevision": base, "currentRevision": current })),
    )
}
