use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error};

use crate::store::{QuestionType, RubricItem};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("AI credential is not configured; set GRADERD_API_KEY")]
    MissingCredential,
    #[error("AI request failed: {0}")]
    Transport(String),
    #[error("AI response did not match the expected shape: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::MissingCredential => "ai_not_configured",
            GatewayError::Transport(_) => "ai_request_failed",
            GatewayError::Decode(_) => "ai_bad_response",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let api_key = std::env::var("GRADERD_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        let base_url =
            std::env::var("GRADERD_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model =
            std::env::var("GRADERD_AI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self {
            api_key,
            base_url,
            model,
        }
    }
}

/// One document going out to the model: base64 bytes plus declared media type.
#[derive(Debug, Clone)]
pub struct EncodedDocument {
    pub data: String,
    pub media_type: String,
}

/// A rubric item as returned by the model. Ids are assigned by the caller;
/// the model's own numbering is not trusted for local use.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricDraft {
    pub question: String,
    pub max_points: f64,
    #[serde(default)]
    pub criteria: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub correct_answer: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeGuess {
    pub student_name: String,
    pub start_page: u32,
    pub end_page: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSuggestion {
    pub rubric_item_id: String,
    pub score: f64,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub student_answer: Option<String>,
}

pub struct AiGateway {
    client: Client,
    config: GatewayConfig,
}

impl AiGateway {
    pub fn new(config: GatewayConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, config }
    }

    /// Extract an ordered rubric from an answer-key document.
    pub fn extract_rubric(&self, doc: &EncodedDocument) -> Result<Vec<RubricDraft>, GatewayError> {
        let instruction = "Extract the grading rubric from this answer key. \
            Return one entry per question with its text, maximum point value, grading criteria, \
            question type (\"free-response\" or \"multiple-choice\") and, for multiple-choice \
            questions, the correct answer letter.";
        let schema = json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "question": { "type": "string" },
                    "maxPoints": { "type": "number" },
                    "criteria": { "type": "string" },
                    "questionType": { "type": "string", "enum": ["free-response", "multiple-choice"] },
                    "correctAnswer": { "type": "string" }
                },
                "required": ["question", "maxPoints", "questionType"]
            }
        });
        self.generate_list(doc, instruction, schema)
    }

    /// Extract a flat list of normalized full names from a roster document.
    pub fn extract_roster(&self, doc: &EncodedDocument) -> Result<Vec<String>, GatewayError> {
        let instruction = "Extract every student's full name from this class roster. \
            Return a flat list of names, each formatted as \"First Last\".";
        let schema = json!({
            "type": "array",
            "items": { "type": "string" }
        });
        self.generate_list(doc, instruction, schema)
    }

    /// Detect per-student page ranges in one concatenated submissions PDF.
    /// The guesses are provisional; the caller lets the user edit them before
    /// anything is committed.
    pub fn detect_ranges(&self, doc: &EncodedDocument) -> Result<Vec<RangeGuess>, GatewayError> {
        let instruction = "This PDF contains several student submissions concatenated together. \
            Detect where each student's work starts and ends. Page numbers are 1-indexed and \
            ranges are inclusive.";
        let schema = json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "studentName": { "type": "string" },
                    "startPage": { "type": "integer" },
                    "endPage": { "type": "integer" }
                },
                "required": ["studentName", "startPage", "endPage"]
            }
        });
        self.generate_list(doc, instruction, schema)
    }

    /// Grade one student document against the rubric. One suggestion per
    /// rubric item, addressed by id.
    pub fn grade_submission(
        &self,
        rubric: &[RubricItem],
        doc: &EncodedDocument,
    ) -> Result<Vec<GradeSuggestion>, GatewayError> {
        let context: Vec<Value> = rubric
            .iter()
            .map(|item| {
                json!({
                    "id": item.id,
                    "question": item.question,
                    "maxPoints": item.max_points,
                    "questionType": item.question_type,
                    "correctAnswer": item.correct_answer,
                    "criteria": item.criteria,
                })
            })
            .collect();
        let instruction = format!(
            "Grade this student submission against the following rubric. For every rubric item \
             return its id, a score between 0 and the item's maxPoints, a short comment, and the \
             student's chosen answer letter when the question is multiple-choice.\n\nRubric:\n{}",
            serde_json::to_string(&context).unwrap_or_default()
        );
        let schema = json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "rubricItemId": { "type": "string" },
                    "score": { "type": "number" },
                    "comment": { "type": "string" },
                    "studentAnswer": { "type": "string" }
                },
                "required": ["rubricItemId", "score"]
            }
        });
        self.generate_list(doc, &instruction, schema)
    }

    /// One round trip: document + instruction + output schema in, the model's
    /// JSON text decoded into a typed list out. Empty text decodes to an
    /// empty list. No retry, no backoff.
    fn generate_list<T: serde::de::DeserializeOwned>(
        &self,
        doc: &EncodedDocument,
        instruction: &str,
        schema: Value,
    ) -> Result<Vec<T>, GatewayError> {
        let text = self.generate(doc, instruction, schema)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|e| {
            error!(error = %e, "AI response failed typed decode");
            GatewayError::Decode(e.to_string())
        })
    }

    fn generate(
        &self,
        doc: &EncodedDocument,
        instruction: &str,
        schema: Value,
    ) -> Result<String, GatewayError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(GatewayError::MissingCredential);
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            api_key
        );
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "inline_data": { "mime_type": doc.media_type, "data": doc.data } },
                    { "text": instruction }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema
            }
        });

        debug!(model = %self.config.model, "sending generateContent request");
        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            error!(error = %e, "AI request failed");
            GatewayError::Transport(e.to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            error!(%status, "AI request returned error status");
            return Err(GatewayError::Transport(format!(
                "{} - {}",
                status, error_text
            )));
        }

        let envelope: Value = response
            .json()
            .map_err(|e| GatewayError::Transport(format!("failed to parse response: {}", e)))?;
        Ok(envelope
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string())
    }
}
