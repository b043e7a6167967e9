use serde_json::json;
use uuid::Uuid;

use crate::calc;
use crate::ipc::error::{err, gateway_err, ok, stale_snapshot};
use crate::ipc::helpers::{base_revision, opt_f64, opt_str, parse_document, required_str, to_encoded};
use crate::ipc::types::{AppState, Request};
use crate::store::{QuestionType, RubricItem};

fn parse_question_type(
    req: &Request,
    key: &str,
) -> Result<Option<QuestionType>, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(None),
        Some(raw) => serde_json::from_value::<QuestionType>(raw.clone())
            .map(Some)
            .map_err(|_| {
                err(
                    &req.id,
                    "bad_params",
                    "questionType must be one of: free-response, multiple-choice",
                    None,
                )
            }),
    }
}

fn rubric_json(items: &[RubricItem]) -> serde_json::Value {
    serde_json::to_value(items).unwrap_or_else(|_| json!([]))
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({ "rubric": rubric_json(&state.store.current().rubric) }),
    )
}

fn handle_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let question = match required_str(req, "question") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(max_points) = opt_f64(req, "maxPoints") else {
        return err(&req.id, "bad_params", "missing maxPoints", None);
    };
    if max_points < 0.0 {
        return err(&req.id, "bad_params", "maxPoints must be >= 0", None);
    }
    let question_type = match parse_question_type(req, "questionType") {
        Ok(v) => v.unwrap_or(QuestionType::FreeResponse),
        Err(e) => return e,
    };

    let item = RubricItem {
        id: Uuid::new_v4().to_string(),
        question,
        max_points,
        criteria: opt_str(req, "criteria").unwrap_or_default(),
        question_type,
        correct_answer: opt_str(req, "correctAnswer"),
    };
    let item_id = item.id.clone();

    let mut next = state.store.current().clone();
    next.rubric.push(item);
    let revision = state.store.commit(next);
    ok(
        &req.id,
        json!({ "revision": revision, "rubricItemId": item_id }),
    )
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let item_id = match required_str(req, "rubricItemId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let question_type = match parse_question_type(req, "questionType") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Some(max_points) = opt_f64(req, "maxPoints") {
        if max_points < 0.0 {
            return err(&req.id, "bad_params", "maxPoints must be >= 0", None);
        }
    }

    let mut next = state.store.current().clone();
    let Some(item) = next.rubric.iter_mut().find(|r| r.id == item_id) else {
        return err(&req.id, "not_found", "rubric item not found", None);
    };

    let mut scoring_changed = false;
    if let Some(question) = opt_str(req, "question") {
        item.question = question;
    }
    if let Some(criteria) = opt_str(req, "criteria") {
        item.criteria = criteria;
    }
    if let Some(max_points) = opt_f64(req, "maxPoints") {
        scoring_changed |= item.max_points != max_points;
        item.max_points = max_points;
    }
    if let Some(qtype) = question_type {
        scoring_changed |= item.question_type != qtype;
        item.question_type = qtype;
    }
    if req.params.get("correctAnswer").is_some() {
        let correct = opt_str(req, "correctAnswer");
        scoring_changed |= item.correct_answer != correct;
        item.correct_answer = correct;
    }

    // The correct-answer comparison is authoritative for multiple-choice:
    // any change to it re-derives every student's score for this item.
    let item = item.clone();
    if scoring_changed && item.question_type == QuestionType::MultipleChoice {
        for student in next.students.iter_mut() {
            if let Some(grade) = student.grades.get_mut(&item.id) {
                calc::apply_mcq_rule(&item, grade);
                calc::refresh_student(student);
            }
        }
    }

    let revision = state.store.commit(next);
    ok(&req.id, json!({ "revision": revision }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let item_id = match required_str(req, "rubricItemId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut next = state.store.current().clone();
    let before = next.rubric.len();
    next.rubric.retain(|r| r.id != item_id);
    if next.rubric.len() == before {
        return err(&req.id, "not_found", "rubric item not found", None);
    }
    for student in next.students.iter_mut() {
        if student.grades.remove(&item_id).is_some() {
            student.total_score = calc::total_score(&student.grades);
        }
    }
    let revision = state.store.commit(next);
    ok(&req.id, json!({ "revision": revision }))
}

fn handle_extract(state: &mut AppState, req: &Request) -> serde_json::Value {
    let document = match parse_document(req, "document") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let base = base_revision(req);

    let drafts = match state.gateway.extract_rubric(&to_encoded(&document)) {
        Ok(v) => v,
        Err(e) => return gateway_err(&req.id, e),
    };

    let mut next = state.store.current().clone();
    next.rubric = drafts
        .into_iter()
        .map(|d| RubricItem {
            id: Uuid::new_v4().to_string(),
            question: d.question,
            max_points: d.max_points.max(0.0),
            criteria: d.criteria,
            question_type: d.question_type,
            correct_answer: d.correct_answer,
        })
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
            "rubric": rubric_json(&state.store.current().rubric),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "rubric.list" => Some(handle_list(state, req)),
        "rubric.add" => Some(handle_add(state, req)),
        "rubric.update" => Some(handle_update(state, req)),
        "rubric.delete" => Some(handle_delete(state, req)),
        "rubric.extract" => Some(handle_extract(state, req)),
        _ => None,
    }
}
