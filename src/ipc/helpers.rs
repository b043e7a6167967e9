use base64::{engine::general_purpose, Engine as _};
use serde_json::json;

use crate::ai::EncodedDocument;
use crate::ipc::error::err;
use crate::ipc::types::Request;
use crate::store::SubmissionFile;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn opt_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
}

pub fn opt_f64(req: &Request, key: &str) -> Option<f64> {
    req.params.get(key).and_then(|v| v.as_f64())
}

/// Optional base revision for operations whose result was computed from an
/// earlier snapshot. Absent means "commit unconditionally".
pub fn base_revision(req: &Request) -> Option<u64> {
    req.params.get("baseRevision").and_then(|v| v.as_u64())
}

/// Parse a `{data, mediaType, fileName}` upload from `params[key]`,
/// verifying the payload is decodable base64 up front.
pub fn parse_document(req: &Request, key: &str) -> Result<SubmissionFile, serde_json::Value> {
    let Some(raw) = req.params.get(key).and_then(|v| v.as_object()) else {
        return Err(err(
            &req.id,
            "bad_params",
            format!("missing {}", key),
            None,
        ));
    };
    let data = raw
        .get("data")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let media_type = raw
        .get("mediaType")
        .and_then(|v| v.as_str())
        .unwrap_or("application/octet-stream")
        .to_string();
    let file_name = raw
        .get("fileName")
        .and_then(|v| v.as_str())
        .unwrap_or("upload")
        .to_string();
    if data.is_empty() {
        return Err(err(
            &req.id,
            "bad_document",
            format!("{}.data must be non-empty base64", key),
            None,
        ));
    }
    if let Err(e) = general_purpose::STANDARD.decode(&data) {
        return Err(err(
            &req.id,
            "bad_document",
            format!("{}.data is not valid base64: {}", key, e),
            Some(json!({ "fileName": file_name })),
        ));
    }
    Ok(SubmissionFile {
        data,
        media_type,
        file_name,
    })
}

pub fn decode_document(
    req: &Request,
    file: &SubmissionFile,
) -> Result<Vec<u8>, serde_json::Value> {
    general_purpose::STANDARD.decode(&file.data).map_err(|e| {
        err(
            &req.id,
            "bad_document",
            format!("document is not valid base64: {}", e),
            None,
        )
    })
}

pub fn to_encoded(file: &SubmissionFile) -> EncodedDocument {
    EncodedDocument {
        data: file.data.clone(),
        media_type: file.media_type.clone(),
    }
}

/// Display name for a directly imported file: the stem with separator
/// characters turned back into spaces.
pub fn display_name_from_file(file_name: &str) -> String {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);
    let cleaned = stem.replace(['_', '-'], " ");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        file_name.to_string()
    } else {
        collapsed
    }
}
