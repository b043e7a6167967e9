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

fn request_ok(
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
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn add_graded_student(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    item_id: &str,
    name: &str,
    score: f64,
) {
    let student = request_ok(
        stdin,
        reader,
        &format!("add-{}", name),
        "students.add",
        json!({ "name": name }),
    );
    let student_id = student["studentId"].as_str().unwrap().to_string();
    request_ok(
        stdin,
        reader,
        &format!("grade-{}", name),
        "grades.set",
        json!({ "studentId": student_id, "rubricItemId": item_id, "score": score }),
    );
}

fn band_count(summary: &serde_json::Value, label: &str) -> u64 {
    summary["distribution"]
        .as_array()
        .expect("distribution")
        .iter()
        .find(|b| b["label"].as_str() == Some(label))
        .unwrap_or_else(|| panic!("band {} present", label))["count"]
        .as_u64()
        .expect("count")
}

#[test]
fn band_boundaries_are_inclusive_of_the_upper_threshold() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let item = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "rubric.add",
        json!({ "question": "Exam", "maxPoints": 100.0 }),
    );
    let item_id = item["rubricItemId"].as_str().unwrap().to_string();

    add_graded_student(&mut stdin, &mut reader, &item_id, "Edge", 20.0);
    add_graded_student(&mut stdin, &mut reader, &item_id, "Over", 21.0);
    add_graded_student(&mut stdin, &mut reader, &item_id, "Top", 100.0);
    // Ungraded student counts toward studentCount only.
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.add",
        json!({ "name": "Pending" }),
    );

    let summary = request_ok(&mut stdin, &mut reader, "3", "analytics.summary", json!({}));
    assert_eq!(summary["maxPossibleScore"], json!(100.0));
    assert_eq!(summary["studentCount"], json!(4));
    assert_eq!(summary["gradedCount"], json!(3));
    assert_eq!(summary["highestScore"], json!(100.0));
    assert_eq!(summary["averageScore"], json!(47.0));

    assert_eq!(band_count(&summary, "0-20%"), 1);
    assert_eq!(band_count(&summary, "21-40%"), 1);
    assert_eq!(band_count(&summary, "81-100%"), 1);
    let total: u64 = summary["distribution"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["count"].as_u64().unwrap())
        .sum();
    assert_eq!(total, 3);

    let _ = child.kill();
}

#[test]
fn empty_graded_set_reports_zeroes() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "rubric.add",
        json!({ "question": "Q1", "maxPoints": 10.0 }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.add",
        json!({ "name": "Pending" }),
    );

    let summary = request_ok(&mut stdin, &mut reader, "3", "analytics.summary", json!({}));
    assert_eq!(summary["gradedCount"], json!(0));
    assert_eq!(summary["averageScore"], json!(0.0));
    assert_eq!(summary["highestScore"], json!(0.0));
    assert_eq!(summary["maxPossibleScore"], json!(10.0));

    let _ = child.kill();
}
