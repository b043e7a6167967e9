use serde_json::json;

use crate::ipc::error::{err, gateway_err, ok, stale_snapshot};
use crate::ipc::helpers::{
    base_revision, display_name_from_file, parse_document, required_str, to_encoded,
};
use crate::ipc::types::{AppState, Request};
use crate::store::{StudentSubmission, SubmissionFile};

fn student_json(s: &StudentSubmission) -> serde_json::Value {
    json!({
        "id": s.id,
        "name": s.name,
        "status": s.status,
        "totalScore": s.total_score,
        "hasFile": s.file.is_some(),
    })
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let students: Vec<serde_json::Value> = state
        .store
        .current()
        .students
        .iter()
        .map(student_json)
        .collect();
    ok(&req.id, json!({ "students": students }))
}

fn handle_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if name.trim().is_empty() {
        return err(&req.id, "bad_params", "name must be non-empty", None);
    }
    let file = if req.params.get("document").is_some() {
        match parse_document(req, "document") {
            Ok(v) => Some(v),
            Err(e) => return e,
        }
    } else {
        None
    };

    let student = StudentSubmission::new(name.trim(), file);
    let student_id = student.id.clone();
    let mut next = state.store.current().clone();
    next.students.push(student);
    let revision = state.store.commit(next);
    ok(
        &req.id,
        json!({ "revision": revision, "studentId": student_id }),
    )
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut next = state.store.current().clone();
    let Some(student) = next.students.iter_mut().find(|s| s.id == student_id) else {
        return err(&req.id, "not_found", "student not found", None);
    };
    if let Some(name) = req.params.get("name").and_then(|v| v.as_str()) {
        if name.trim().is_empty() {
            return err(&req.id, "bad_params", "name must be non-empty", None);
        }
        student.name = name.trim().to_string();
    }
    let revision = state.store.commit(next);
    ok(&req.id, json!({ "revision": revision }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut next = state.store.current().clone();
    let before = next.students.len();
    next.students.retain(|s| s.id != student_id);
    if next.students.len() == before {
        return err(&req.id, "not_found", "student not found", None);
    }
    let revision = state.store.commit(next);
    ok(&req.id, json!({ "revision": revision }))
}

fn handle_attach(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let document = match parse_document(req, "document") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut next = state.store.current().clone();
    let Some(student) = next.students.iter_mut().find(|s| s.id == student_id) else {
        return err(&req.id, "not_found", "student not found", None);
    };
    student.file = Some(document);
    let revision = state.store.commit(next);
    ok(&req.id, json!({ "revision": revision }))
}

/// Direct import: one file becomes one pending student, named after the
/// file's stem.
fn handle_import_files(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw_files) = req.params.get("files").and_then(|v| v.as_array()) else {
        return err(&req.id, "bad_params", "missing files", None);
    };
    if raw_files.is_empty() {
        return err(&req.id, "bad_params", "files must be non-empty", None);
    }

    let mut files: Vec<SubmissionFile> = Vec::with_capacity(raw_files.len());
    for raw in raw_files {
        // Reuse the single-document parser against a synthetic request so
        // every entry gets the same base64 validation.
        let sub_req = Request {
            id: req.id.clone(),
            method: req.method.clone(),
            params: json!({ "document": raw }),
        };
        match parse_document(&sub_req, "document") {
            Ok(f) => files.push(f),
            Err(e) => return e,
        }
    }

    let mut next = state.store.current().clone();
    let mut created = Vec::with_capacity(files.len());
    for file in files {
        let name = display_name_from_file(&file.file_name);
        let student = StudentSubmission::new(name, Some(file));
        created.push(student_json(&student));
        next.students.push(student);
    }
    let revision = state.store.commit(next);
    ok(
        &req.id,
        json!({ "revision": revision, "created": created }),
    )
}

/// AI roster extraction. Appends one pending student per returned name.
/// Names are not deduplicated; importing the same roster twice yields
/// duplicate entries.
fn handle_extract(state: &mut AppState, req: &Request) -> serde_json::Value {
    let document = match parse_document(req, "document") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let base = base_revision(req);

    let names = match state.gateway.extract_roster(&to_encoded(&document)) {
        Ok(v) => v,
        Err(e) => return gateway_err(&req.id, e),
    };

    let mut next = state.store.current().clone();
    let mut created = Vec::with_capacity(names.len());
    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            continue;
        }
        let student = StudentSubmission::new(trimmed, None);
        created.push(student_json(&student));
        next.students.push(student);
    }
    let revision = match base {
        Some(base) => match state.store.commit_if_current(base, next) {
            Ok(v) => v,
            Err(current) => return stale_snapshot(&req.id, base, current),
        },
        None => state.store.commit(next),
    };
    ok(
        &req.id,
        json!({ "revision": revision, "created": created }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_list(state, req)),
        "students.add" => Some(handle_add(state, req)),
        "students.update" => Some(handle_update(state, req)),
        "students.delete" => Some(handle_delete(state, req)),
        "submissions.attach" => Some(handle_attach(state, req)),
        "roster.importFiles" => Some(handle_import_files(state, req)),
        "roster.extract" => Some(handle_extract(state, req)),
        _ => None,
    }
}
