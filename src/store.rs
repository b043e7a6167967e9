use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_CANNED_COMMENTS: &[&str] = &[
    "Excellent work!",
    "Good effort, but check your calculations.",
    "Please show your work for full credit.",
    "Incomplete answer.",
    "Review this topic before the next assessment.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentStatus {
    Draft,
    Ready,
    Grading,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    FreeResponse,
    MultipleChoice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Graded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricItem {
    pub id: String,
    pub question: String,
    pub max_points: f64,
    pub criteria: String,
    pub question_type: QuestionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

/// An uploaded file kept in memory as base64 text plus its declared media type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionFile {
    pub data: String,
    pub media_type: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionGrade {
    pub score: f64,
    #[serde(default)]
    pub comment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_answer: Option<String>,
    #[serde(default)]
    pub ai_generated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSubmission {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<SubmissionFile>,
    #[serde(default)]
    pub grades: HashMap<String, QuestionGrade>,
    pub status: SubmissionStatus,
    pub total_score: f64,
}

impl StudentSubmission {
    pub fn new(name: impl Into<String>, file: Option<SubmissionFile>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            file,
            grades: HashMap::new(),
            status: SubmissionStatus::Pending,
            total_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: AssessmentStatus,
    pub rubric: Vec<RubricItem>,
    pub students: Vec<StudentSubmission>,
    pub canned_comments: Vec<String>,
    pub created_at: String,
}

impl Assessment {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: "Untitled Assessment".to_string(),
            description: String::new(),
            status: AssessmentStatus::Draft,
            rubric: Vec::new(),
            students: Vec::new(),
            canned_comments: DEFAULT_CANNED_COMMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            created_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn rubric_item(&self, id: &str) -> Option<&RubricItem> {
        self.rubric.iter().find(|r| r.id == id)
    }

    pub fn student(&self, id: &str) -> Option<&StudentSubmission> {
        self.students.iter().find(|s| s.id == id)
    }
}

/// Single-owner container for the in-memory assessment.
///
/// Handlers read an immutable snapshot, build a full replacement, and commit
/// it back; each commit bumps `revision`. Operations whose result was computed
/// from an older snapshot (AI calls, splits) pass that snapshot's revision and
/// are rejected instead of overwriting newer state.
pub struct AssessmentStore {
    current: Assessment,
    revision: u64,
}

impl AssessmentStore {
    pub fn new() -> Self {
        Self {
            current: Assessment::new(),
            revision: 0,
        }
    }

    pub fn current(&self) -> &Assessment {
        &self.current
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn commit(&mut self, next: Assessment) -> u64 {
        self.current = next;
        self.revision += 1;
        self.revision
    }

    /// Commit a replacement computed from the snapshot at `base_revision`.
    /// Fails if the store moved on since that snapshot was taken.
    pub fn commit_if_current(&mut self, base_revision: u64, next: Assessment) -> Result<u64, u64> {
        if base_revision != self.revision {
            return Err(self.revision);
        }
        Ok(self.commit(next))
    }
}
