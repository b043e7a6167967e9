use std::collections::HashMap;

use serde::Serialize;

use crate::store::{Assessment, QuestionGrade, QuestionType, RubricItem, StudentSubmission, SubmissionStatus};

/// Percentage bands for the score distribution, checked in ascending order
/// with `percentage <= threshold`; the last band catches everything else.
const DISTRIBUTION_BANDS: &[(&str, f64)] = &[
    ("0-20%", 20.0),
    ("21-40%", 40.0),
    ("41-60%", 60.0),
    ("61-80%", 80.0),
    ("81-100%", f64::INFINITY),
];

/// Mechanical multiple-choice scoring: full marks on a trimmed,
/// case-insensitive letter match, zero otherwise. Returns `None` when either
/// letter is absent or blank, in which case no score can be derived.
pub fn mcq_score(
    max_points: f64,
    student_answer: Option<&str>,
    correct_answer: Option<&str>,
) -> Option<f64> {
    let student = student_answer.map(str::trim).filter(|s| !s.is_empty())?;
    let correct = correct_answer.map(str::trim).filter(|s| !s.is_empty())?;
    if student.eq_ignore_ascii_case(correct) {
        Some(max_points)
    } else {
        Some(0.0)
    }
}

/// Sum of all per-item scores. Map traversal order must not matter, and with
/// f64 addition it can: accumulate in rubric-item id order so repeated calls
/// over the same grades always agree.
pub fn total_score(grades: &HashMap<String, QuestionGrade>) -> f64 {
    let mut ids: Vec<&String> = grades.keys().collect();
    ids.sort();
    ids.iter().map(|id| grades[id.as_str()].score).sum()
}

/// Re-derive the score of one grade entry when the owning item is
/// multiple-choice and both letters are present. Overrides whatever score was
/// there, including AI suggestions. Returns true if the score changed.
pub fn apply_mcq_rule(item: &RubricItem, grade: &mut QuestionGrade) -> bool {
    if item.question_type != QuestionType::MultipleChoice {
        return false;
    }
    let derived = mcq_score(
        item.max_points,
        grade.student_answer.as_deref(),
        item.correct_answer.as_deref(),
    );
    match derived {
        Some(score) if score != grade.score => {
            grade.score = score;
            true
        }
        _ => false,
    }
}

/// Recompute the denormalized per-student total and flip `pending` to
/// `graded`. Called after every grade mutation; never transitions back.
pub fn refresh_student(student: &mut StudentSubmission) {
    student.total_score = total_score(&student.grades);
    if student.status == SubmissionStatus::Pending && !student.grades.is_empty() {
        student.status = SubmissionStatus::Graded;
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionBand {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub max_possible_score: f64,
    pub student_count: usize,
    pub graded_count: usize,
    pub average_score: f64,
    pub highest_score: f64,
    pub distribution: Vec<DistributionBand>,
}

pub fn summarize(assessment: &Assessment) -> AnalyticsSummary {
    let max_possible: f64 = assessment.rubric.iter().map(|r| r.max_points).sum();
    let graded: Vec<&StudentSubmission> = assessment
        .students
        .iter()
        .filter(|s| s.status == SubmissionStatus::Graded)
        .collect();

    let average_score = if graded.is_empty() {
        0.0
    } else {
        graded.iter().map(|s| s.total_score).sum::<f64>() / (graded.len() as f64)
    };
    let highest_score = graded
        .iter()
        .map(|s| s.total_score)
        .fold(0.0_f64, f64::max);

    let mut counts = vec![0usize; DISTRIBUTION_BANDS.len()];
    for s in &graded {
        let percentage = if max_possible > 0.0 {
            100.0 * s.total_score / max_possible
        } else {
            0.0
        };
        for (i, (_, threshold)) in DISTRIBUTION_BANDS.iter().enumerate() {
            if percentage <= *threshold {
                counts[i] += 1;
                break;
            }
        }
    }
    let distribution = DISTRIBUTION_BANDS
        .iter()
        .zip(counts)
        .map(|((label, _), count)| DistributionBand {
            label: label.to_string(),
            count,
        })
        .collect();

    AnalyticsSummary {
        max_possible_score: max_possible,
        student_count: assessment.students.len(),
        graded_count: graded.len(),
        average_score,
        highest_score,
        distribution,
    }
}

fn csv_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Quote only when the field would otherwise break the record.
fn csv_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        csv_quote(s)
    } else {
        s.to_string()
    }
}

/// Render a point value without a trailing `.0` for whole numbers.
fn fmt_points(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

pub fn csv_file_name(title: &str) -> String {
    let stem = title.split_whitespace().collect::<Vec<_>>().join("_");
    format!("{}_grades.csv", stem)
}

/// One row per student (graded or not): name, total, one raw score column per
/// rubric item (0 when absent), then a single quoted column joining each
/// item's non-empty comment with " | ", inner quotes doubled.
pub fn grades_csv(assessment: &Assessment) -> String {
    let mut out = String::from("Student Name,Total Score");
    for item in &assessment.rubric {
        out.push(',');
        out.push_str(&csv_quote(&format!(
            "{} ({})",
            item.question,
            fmt_points(item.max_points)
        )));
    }
    out.push_str(",Comments\n");

    for student in &assessment.students {
        out.push_str(&csv_field(&student.name));
        out.push(',');
        out.push_str(&fmt_points(student.total_score));
        let mut comments: Vec<&str> = Vec::new();
        for item in &assessment.rubric {
            let grade = student.grades.get(&item.id);
            out.push(',');
            out.push_str(&fmt_points(grade.map(|g| g.score).unwrap_or(0.0)));
            if let Some(g) = grade {
                if !g.comment.is_empty() {
                    comments.push(&g.comment);
                }
            }
        }
        out.push(',');
        out.push_str(&csv_quote(&comments.join(" | ")));
        out.push('\n');
    }
    out
}
