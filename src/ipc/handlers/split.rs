use serde_json::json;

use crate::ipc::error::{err, gateway_err, ok, stale_snapshot};
use crate::ipc::helpers::{base_revision, decode_document, parse_document, to_encoded};
use crate::ipc::types::{AppState, Request};
use crate::pdf::{self, SplitRange};
use crate::store::{StudentSubmission, SubmissionFile};
use base64::{engine::general_purpose, Engine as _};

/// AI page-range detection over one concatenated PDF. The guesses are
/// returned for the user to edit; nothing is committed here.
fn handle_detect(state: &mut AppState, req: &Request) -> serde_json::Value {
    let document = match parse_document(req, "document") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let guesses = match state.gateway.detect_ranges(&to_encoded(&document)) {
        Ok(v) => v,
        Err(e) => return gateway_err(&req.id, e),
    };
    let ranges: Vec<serde_json::Value> = guesses
        .iter()
        .map(|g| {
            json!({
                "studentName": g.student_name,
                "startPage": g.start_page,
                "endPage": g.end_page,
            })
        })
        .collect();
    ok(&req.id, json!({ "ranges": ranges }))
}

fn parse_ranges(req: &Request) -> Result<Vec<SplitRange>, serde_json::Value> {
    let Some(raw) = req.params.get("ranges") else {
        return Err(err(&req.id, "bad_params", "missing ranges", None));
    };
    let ranges: Vec<SplitRange> = serde_json::from_value(raw.clone()).map_err(|e| {
        err(
            &req.id,
            "bad_params",
            format!("ranges must be a list of {{studentName, startPage, endPage}}: {}", e),
            None,
        )
    })?;
    if ranges.is_empty() {
        return Err(err(&req.id, "bad_params", "ranges must be non-empty", None));
    }
    Ok(ranges)
}

/// Split the source PDF and merge the extracted documents into the roster.
/// A range whose name matches an existing student (trimmed,
/// case-insensitive) attaches to that student; otherwise a new pending
/// student is created. Ranges are independent: per-range failures are
/// reported in-band and never abort the batch.
fn handle_apply(state: &mut AppState, req: &Request) -> serde_json::Value {
    let document = match parse_document(req, "document") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let ranges = match parse_ranges(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let base = base_revision(req);
    let source = match decode_document(req, &document) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let result = match pdf::split_document(&source, &ranges) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "pdf_split_failed", e.to_string(), None),
    };

    let mut next = state.store.current().clone();
    let mut created = Vec::new();
    let mut attached = Vec::new();
    for output in &result.outputs {
        let file = SubmissionFile {
            data: general_purpose::STANDARD.encode(&output.bytes),
            media_type: "application/pdf".to_string(),
            file_name: format!("{}.pdf", output.student_name.replace(' ', "_")),
        };
        let wanted = output.student_name.trim().to_lowercase();
        if let Some(existing) = next
            .students
            .iter_mut()
            .find(|s| s.name.trim().to_lowercase() == wanted)
        {
            existing.file = Some(file);
            attached.push(json!({
                "studentId": existing.id,
                "name": existing.name,
                "pages": output.page_count,
            }));
        } else {
            let student = StudentSubmission::new(output.student_name.trim(), Some(file));
            created.push(json!({
                "studentId": student.id,
                "name": student.name,
                "pages": output.page_count,
            }));
            next.students.push(student);
        }
    }

    let failures: Vec<serde_json::Value> = result
        .failures
        .iter()
        .map(|f| json!({ "studentName": f.student_name, "reason": f.reason }))
        .collect();

    let revision = match base {
        Some(base) => match state.store.commit_if_current(base, next) {
            Ok(v) => v,
            Err(current) => return stale_snapshot(&req.id, base, current),
        },
        None => state.store.commit(next),
    };
    ok(
        &req.id,
        json!({
            "revision": revision,
            "created": created,
            "attached": attached,
            "skipped": result.skipped,
            "failures": failures,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "split.detect" => Some(handle_detect(state, req)),
        "split.apply" => Some(handle_apply(state, req)),
        _ => None,
    }
}
