use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_graderd");
    let mut child = Command::new(exe)
        .env_remove("GRADERD_API_KEY")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn graderd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({ "id": id, "method": method, "params": params });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    serde_json::from_str(line.trim()).expect("parse response json")
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn student_from_assessment<'a>(
    assessment: &'a serde_json::Value,
    student_id: &str,
) -> &'a serde_json::Value {
    assessment
        .get("students")
        .and_then(|v| v.as_array())
        .expect("students array")
        .iter()
        .find(|s| s.get("id").and_then(|v| v.as_str()) == Some(student_id))
        .expect("student present")
}

#[test]
fn mcq_answer_match_scores_full_points_and_marks_graded() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let added = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "rubric.add",
        json!({
            "question": "Q1",
            "maxPoints": 5.0,
            "questionType": "multiple-choice",
            "correctAnswer": "B"
        }),
    );
    let item_id = added["rubricItemId"].as_str().expect("item id").to_string();

    let student = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.add",
        json!({ "name": "Alice Nguyen" }),
    );
    let student_id = student["studentId"].as_str().expect("student id").to_string();

    let set = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "grades.setAnswer",
        json!({ "studentId": student_id, "rubricItemId": item_id, "studentAnswer": "b" }),
    );
    assert_eq!(set["grade"]["score"], json!(5.0));
    assert_eq!(set["status"], json!("graded"));
    assert_eq!(set["totalScore"], json!(5.0));

    // Wrong letter re-derives to zero but status never goes back to pending.
    let set = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "grades.setAnswer",
        json!({ "studentId": student_id, "rubricItemId": item_id, "studentAnswer": "C" }),
    );
    assert_eq!(set["grade"]["score"], json!(0.0));
    assert_eq!(set["status"], json!("graded"));

    let _ = child.kill();
}

#[test]
fn total_score_is_sum_over_all_items() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let q1 = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "rubric.add",
        json!({ "question": "Q1", "maxPoints": 10.0 }),
    );
    let q2 = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "rubric.add",
        json!({ "question": "Q2", "maxPoints": 6.0 }),
    );
    let q1_id = q1["rubricItemId"].as_str().unwrap().to_string();
    let q2_id = q2["rubricItemId"].as_str().unwrap().to_string();

    let student = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.add",
        json!({ "name": "Bob Ortiz" }),
    );
    let student_id = student["studentId"].as_str().unwrap().to_string();

    request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "grades.set",
        json!({ "studentId": student_id, "rubricItemId": q1_id, "score": 7.5, "comment": "close" }),
    );
    let second = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "grades.set",
        json!({ "studentId": student_id, "rubricItemId": q2_id, "score": 4.0 }),
    );
    assert_eq!(second["totalScore"], json!(11.5));

    // Re-setting one item recomputes the total from all entries, not a delta.
    let third = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "grades.set",
        json!({ "studentId": student_id, "rubricItemId": q1_id, "score": 2.0 }),
    );
    assert_eq!(third["totalScore"], json!(6.0));

    let _ = child.kill();
}

#[test]
fn changing_correct_answer_rederives_existing_mcq_scores() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let added = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "rubric.add",
        json!({
            "question": "Q1",
            "maxPoints": 4.0,
            "questionType": "multiple-choice",
            "correctAnswer": "A"
        }),
    );
    let item_id = added["rubricItemId"].as_str().unwrap().to_string();
    let student = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.add",
        json!({ "name": "Cara" }),
    );
    let student_id = student["studentId"].as_str().unwrap().to_string();

    let set = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "grades.setAnswer",
        json!({ "studentId": student_id, "rubricItemId": item_id, "studentAnswer": "D" }),
    );
    assert_eq!(set["grade"]["score"], json!(0.0));

    request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "rubric.update",
        json!({ "rubricItemId": item_id, "correctAnswer": "D" }),
    );

    let got = request_ok(&mut stdin, &mut reader, "5", "assessment.get", json!({}));
    let student = student_from_assessment(&got["assessment"], &student_id);
    assert_eq!(student["grades"][&item_id]["score"], json!(4.0));
    assert_eq!(student["totalScore"], json!(4.0));

    let _ = child.kill();
}

#[test]
fn deleting_a_rubric_item_drops_its_grades_from_totals() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let q1 = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "rubric.add",
        json!({ "question": "Q1", "maxPoints": 10.0 }),
    );
    let q2 = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "rubric.add",
        json!({ "question": "Q2", "maxPoints": 10.0 }),
    );
    let q1_id = q1["rubricItemId"].as_str().unwrap().to_string();
    let q2_id = q2["rubricItemId"].as_str().unwrap().to_string();
    let student = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.add",
        json!({ "name": "Dee" }),
    );
    let student_id = student["studentId"].as_str().unwrap().to_string();

    request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "grades.set",
        json!({ "studentId": student_id, "rubricItemId": q1_id, "score": 9.0 }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "grades.set",
        json!({ "studentId": student_id, "rubricItemId": q2_id, "score": 3.0 }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "rubric.delete",
        json!({ "rubricItemId": q1_id }),
    );

    let got = request_ok(&mut stdin, &mut reader, "7", "assessment.get", json!({}));
    let student = student_from_assessment(&got["assessment"], &student_id);
    assert_eq!(student["totalScore"], json!(3.0));
    assert!(student["grades"].get(&q1_id).is_none());

    let _ = child.kill();
}

#[test]
fn mcq_rederivation_overrides_manually_set_score() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let added = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "rubric.add",
        json!({
            "question": "Q1",
            "maxPoints": 5.0,
            "questionType": "multiple-choice",
            "correctAnswer": "B"
        }),
    );
    let item_id = added["rubricItemId"].as_str().unwrap().to_string();
    let student = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.add",
        json!({ "name": "Eve" }),
    );
    let student_id = student["studentId"].as_str().unwrap().to_string();

    request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "grades.setAnswer",
        json!({ "studentId": student_id, "rubricItemId": item_id, "studentAnswer": "B" }),
    );
    // A manual score on a multiple-choice item loses to the comparison.
    let set = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "grades.set",
        json!({ "studentId": student_id, "rubricItemId": item_id, "score": 1.0 }),
    );
    assert_eq!(set["grade"]["score"], json!(5.0));

    let _ = child.kill();
}
