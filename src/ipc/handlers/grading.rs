use serde_json::json;

use crate::calc;
use crate::ipc::error::{err, gateway_err, ok, stale_snapshot};
use crate::ipc::helpers::{base_revision, opt_f64, opt_str, required_str, to_encoded};
use crate::ipc::types::{AppState, Request};
use crate::store::QuestionGrade;

fn blank_grade() -> QuestionGrade {
    QuestionGrade {
        score: 0.0,
        comment: String::new(),
        student_answer: None,
        ai_generated: false,
    }
}

fn grade_json(student_id: &str, item_id: &str, grade: &QuestionGrade, total: f64) -> serde_json::Value {
    json!({
        "studentId": student_id,
        "rubricItemId": item_id,
        "grade": {
            "score": grade.score,
            "comment": grade.comment,
            "studentAnswer": grade.student_answer,
            "aiGenerated": grade.ai_generated,
        },
        "totalScore": total,
    })
}

fn handle_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let item_id = match required_str(req, "rubricItemId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let score = opt_f64(req, "score");
    let comment = opt_str(req, "comment");
    if score.is_none() && comment.is_none() {
        return err(&req.id, "bad_params", "nothing to set", None);
    }

    let mut next = state.store.current().clone();
    let Some(item) = next.rubric.iter().find(|r| r.id == item_id).cloned() else {
        return err(&req.id, "not_found", "rubric item not found", None);
    };
    let Some(student) = next.students.iter_mut().find(|s| s.id == student_id) else {
        return err(&req.id, "not_found", "student not found", None);
    };

    let grade = student
        .grades
        .entry(item_id.clone())
        .or_insert_with(blank_grade);
    if let Some(score) = score {
        grade.score = score;
    }
    if let Some(comment) = comment {
        grade.comment = comment;
    }
    grade.ai_generated = false;
    calc::apply_mcq_rule(&item, grade);
    let grade = grade.clone();
    calc::refresh_student(student);
    let total = student.total_score;
    let status = student.status;

    let revision = state.store.commit(next);
    let mut payload = grade_json(&student_id, &item_id, &grade, total);
    payload["status"] = json!(status);
    payload["revision"] = json!(revision);
    ok(&req.id, payload)
}

fn handle_set_answer(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let item_id = match required_str(req, "rubricItemId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let answer = match required_str(req, "studentAnswer") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let mut next = state.store.current().clone();
    let Some(item) = next.rubric.iter().find(|r| r.id == item_id).cloned() else {
        return err(&req.id, "not_found", "rubric item not found", None);
    };
    let Some(student) = next.students.iter_mut().find(|s| s.id == student_id) else {
        return err(&req.id, "not_found", "student not found", None);
    };

    let grade = student
        .grades
        .entry(item_id.clone())
        .or_insert_with(blank_grade);
    grade.student_answer = if answer.trim().is_empty() {
        None
    } else {
        Some(answer.trim().to_string())
    };
    grade.ai_generated = false;
    calc::apply_mcq_rule(&item, grade);
    let grade = grade.clone();
    calc::refresh_student(student);
    let total = student.total_score;
    let status = student.status;

    let revision = state.store.commit(next);
    let mut payload = grade_json(&student_id, &item_id, &grade, total);
    payload["status"] = json!(status);
    payload["revision"] = json!(revision);
    ok(&req.id, payload)
}

/// AI grading of one student's submission. Suggestions land with the
/// aiGenerated flag set; multiple-choice scores are re-derived from the
/// answer comparison rather than trusted verbatim.
fn handle_suggest(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let base = base_revision(req);

    let snapshot = state.store.current();
    let Some(student) = snapshot.student(&student_id) else {
        return err(&req.id, "not_found", "student not found", None);
    };
    let Some(file) = student.file.as_ref() else {
        return err(
            &req.id,
            "bad_params",
            "student has no submission file to grade",
            None,
        );
    };
    if snapshot.rubric.is_empty() {
        return err(&req.id, "bad_params", "rubric is empty", None);
    }

    let suggestions = match state
        .gateway
        .grade_submission(&snapshot.rubric, &to_encoded(file))
    {
        Ok(v) => v,
        Err(e) => return gateway_err(&req.id, e),
    };

    let mut next = state.store.current().clone();
    let rubric = next.rubric.clone();
    let Some(student) = next.students.iter_mut().find(|s| s.id == student_id) else {
        return err(&req.id, "not_found", "student not found", None);
    };

    let mut applied = 0usize;
    let mut ignored: Vec<String> = Vec::new();
    for suggestion in suggestions {
        let Some(item) = rubric.iter().find(|r| r.id == suggestion.rubric_item_id) else {
            ignored.push(suggestion.rubric_item_id);
            continue;
        };
        let grade = student
            .grades
            .entry(item.id.clone())
            .or_insert_with(blank_grade);
        grade.score = suggestion.score;
        grade.comment = suggestion.comment;
        grade.student_answer = suggestion
            .student_answer
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        grade.ai_generated = true;
        calc::apply_mcq_rule(item, grade);
        applied += 1;
    }
    if applied > 0 {
        calc::refresh_student(student);
    }
    let total = student.total_score;
    let status = student.status;

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
            "studentId": student_id,
            "applied": applied,
            "ignoredRubricItemIds": ignored,
            "totalScore": total,
            "status": status,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.set" => Some(handle_set(state, req)),
        "grades.setAnswer" => Some(handle_set_answer(state, req)),
        "grades.suggest" => Some(handle_suggest(state, req)),
        _ => None,
    }
}
