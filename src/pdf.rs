use lopdf::Document;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("document is not a readable PDF: {0}")]
    Unreadable(#[from] lopdf::Error),
    #[error("failed to serialize split document: {0}")]
    Serialize(String),
}

/// A provisional per-student page range over one concatenated PDF,
/// 1-indexed and inclusive on both ends. Produced by AI detection or manual
/// edit, consumed once by [`split_document`]; never stored in the assessment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitRange {
    pub student_name: String,
    pub start_page: u32,
    pub end_page: u32,
}

#[derive(Debug)]
pub struct SplitOutput {
    pub student_name: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

#[derive(Debug)]
pub struct SplitFailure {
    pub student_name: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct SplitResult {
    pub outputs: Vec<SplitOutput>,
    /// Ranges that clipped down to zero pages; no document is produced.
    pub skipped: Vec<String>,
    pub failures: Vec<SplitFailure>,
}

/// Split one source PDF into standalone per-range documents.
///
/// Pages beyond the source's page count are silently dropped; a start page
/// below 1 is clamped to 1. A range left with zero pages is skipped rather
/// than producing an empty document. Ranges are independent: a failure while
/// assembling one output is recorded and the rest still go through. Output
/// order matches input range order.
pub fn split_document(source: &[u8], ranges: &[SplitRange]) -> Result<SplitResult, PdfError> {
    let doc = Document::load_mem(source)?;
    let page_count = doc.get_pages().len() as u32;

    let mut result = SplitResult::default();
    for range in ranges {
        let start = if range.start_page < 1 {
            warn!(
                student = %range.student_name,
                start_page = range.start_page,
                "clamping start page to 1"
            );
            1
        } else {
            range.start_page
        };
        let end = range.end_page.min(page_count);
        if start > end {
            result.skipped.push(range.student_name.clone());
            continue;
        }

        match extract_pages(&doc, page_count, start, end) {
            Ok(bytes) => result.outputs.push(SplitOutput {
                student_name: range.student_name.clone(),
                bytes,
                page_count: (end - start + 1) as usize,
            }),
            Err(e) => result.failures.push(SplitFailure {
                student_name: range.student_name.clone(),
                reason: e.to_string(),
            }),
        }
    }
    Ok(result)
}

fn extract_pages(doc: &Document, page_count: u32, start: u32, end: u32) -> Result<Vec<u8>, PdfError> {
    let delete: Vec<u32> = (1..=page_count).filter(|p| *p < start || *p > end).collect();
    let mut out = doc.clone();
    if !delete.is_empty() {
        out.delete_pages(&delete);
    }
    out.prune_objects();
    out.renumber_objects();
    out.compress();
    let mut bytes = Vec::new();
    out.save_to(&mut bytes)
        .map_err(|e| PdfError::Serialize(e.to_string()))?;
    Ok(bytes)
}
