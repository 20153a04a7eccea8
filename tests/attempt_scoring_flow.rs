use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_quizd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn quizd");
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
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
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

/// Seeds a two-question quiz ("4" and "Jupiter" are the right answers) and
/// returns its id.
fn seed_quiz(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    negative_marking: bool,
) -> String {
    let _ = request_ok(
        stdin,
        reader,
        "seed-1",
        "draft.configure",
        json!({ "questionCount": 2, "optionsPerQuestion": 3 }),
    );
    let blocks: [(&str, [&str; 3], &str); 2] = [
        ("What is 2 + 2?", ["3", "4", "5"], "4"),
        ("Largest planet?", ["Mars", "Venus", "Jupiter"], "Jupiter"),
    ];
    for (index, (text, options, correct)) in blocks.iter().enumerate() {
        let _ = request_ok(
            stdin,
            reader,
            &format!("seed-q{}-text", index),
            "draft.updateBlock",
            json!({ "index": index, "field": "questionText", "value": text }),
        );
        for (slot, option) in options.iter().enumerate() {
            let _ = request_ok(
                stdin,
                reader,
                &format!("seed-q{}-opt{}", index, slot),
                "draft.updateBlock",
                json!({ "index": index, "field": "option", "slot": slot, "value": option }),
            );
        }
        let _ = request_ok(
            stdin,
            reader,
            &format!("seed-q{}-correct", index),
            "draft.updateBlock",
            json!({ "index": index, "field": "correctAnswer", "value": correct }),
        );
        let _ = request_ok(
            stdin,
            reader,
            &format!("seed-q{}-marks", index),
            "draft.updateBlock",
            json!({ "index": index, "field": "marks", "value": 4 }),
        );
    }
    let committed = request_ok(
        stdin,
        reader,
        "seed-commit",
        "draft.commit",
        json!({
            "quiz": {
                "title": "Seeded",
                "timeLimitMinutes": 2,
                "negativeMarking": negative_marking,
                "competitionMode": false
            }
        }),
    );
    committed["quizId"].as_str().expect("quiz id").to_string()
}

#[test]
fn full_attempt_lands_on_the_leaderboard() {
    let workspace = temp_dir("quizd-attempt-flow");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let quiz_id = seed_quiz(&mut stdin, &mut reader, false);

    let started = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attempt.start",
        json!({ "quizId": quiz_id, "studentName": "Ada" }),
    );
    let session = started["sessionId"].as_str().expect("session").to_string();
    assert_eq!(started["totalQuestions"], 2);
    assert_eq!(started["timeLeft"], 120);
    // The runner never leaks the correct answer to the shell.
    assert!(started["question"].get("correctAnswer").is_none());

    // Advancing without a selection is refused and changes nothing.
    let refused = request(
        &mut stdin,
        &mut reader,
        "3",
        "attempt.next",
        json!({ "sessionId": session }),
    );
    assert_eq!(refused["error"]["code"], "no_selection");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "attempt.select",
        json!({ "sessionId": session, "answer": "4" }),
    );
    let moved = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "attempt.next",
        json!({ "sessionId": session }),
    );
    assert_eq!(moved["finished"], false);
    assert_eq!(moved["currentIndex"], 1);

    // Revisit the first question: the recorded answer comes back.
    let back = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "attempt.previous",
        json!({ "sessionId": session }),
    );
    assert_eq!(back["currentIndex"], 0);
    assert_eq!(back["selected"], "4");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "attempt.next",
        json!({ "sessionId": session }),
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "attempt.select",
        json!({ "sessionId": session, "answer": "Mars" }),
    );
    let finished = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "attempt.next",
        json!({ "sessionId": session }),
    );
    assert_eq!(finished["finished"], true);
    // One right (4 marks), one wrong (0, no negative marking).
    assert_eq!(finished["summary"]["score"], 4.0);
    assert_eq!(finished["summary"]["correctCount"], 1);
    assert_eq!(finished["summary"]["incorrectCount"], 1);
    // Review exposes the correct answer only for the wrong entry.
    assert!(finished["summary"]["review"][0].get("correctAnswer").is_none());
    assert_eq!(finished["summary"]["review"][1]["correctAnswer"], "Jupiter");

    let boards = request_ok(&mut stdin, &mut reader, "10", "leaderboard.get", json!({}));
    let board = &boards["boards"][0];
    assert_eq!(board["quizId"].as_str(), Some(quiz_id.as_str()));
    assert_eq!(board["rows"][0]["studentName"], "Ada");
    assert_eq!(board["rows"][0]["score"], 4.0);
    assert_eq!(board["rows"][0]["totalQuestions"], 2);

    // Terminal state: nothing more can happen on this session.
    let stray = request(
        &mut stdin,
        &mut reader,
        "11",
        "attempt.next",
        json!({ "sessionId": session }),
    );
    assert_eq!(stray["error"]["code"], "already_finished");
}

#[test]
fn negative_marking_penalizes_wrong_answers() {
    let workspace = temp_dir("quizd-attempt-negative");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let quiz_id = seed_quiz(&mut stdin, &mut reader, true);

    let started = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attempt.start",
        json!({ "quizId": quiz_id, "studentName": "Grace" }),
    );
    let session = started["sessionId"].as_str().expect("session").to_string();

    // Both wrong: each question is worth 4 marks, each costs 0.25 * 4.
    for (i, answer) in ["3", "Mars"].iter().enumerate() {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("sel-{}", i),
            "attempt.select",
            json!({ "sessionId": session, "answer": answer }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("next-{}", i),
            "attempt.next",
            json!({ "sessionId": session }),
        );
    }

    let summary = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attempt.summary",
        json!({ "sessionId": session }),
    );
    assert_eq!(summary["summary"]["score"], -2.0);
    assert_eq!(summary["summary"]["review"][0]["marksObtained"], -1.0);
}

#[test]
fn submit_without_student_name_is_refused() {
    let workspace = temp_dir("quizd-attempt-noname");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let quiz_id = seed_quiz(&mut stdin, &mut reader, false);

    let started = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attempt.start",
        json!({ "quizId": quiz_id }),
    );
    let session = started["sessionId"].as_str().expect("session").to_string();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attempt.select",
        json!({ "sessionId": session, "answer": "4" }),
    );
    let refused = request(
        &mut stdin,
        &mut reader,
        "4",
        "attempt.submit",
        json!({ "sessionId": session }),
    );
    assert_eq!(refused["error"]["code"], "student_name_missing");

    // Supplying the name with the retry succeeds.
    let finished = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "attempt.submit",
        json!({ "sessionId": session, "studentName": "Late Entry" }),
    );
    assert_eq!(finished["finished"], true);
    assert_eq!(finished["summary"]["studentName"], "Late Entry");
    assert_eq!(finished["summary"]["score"], 4.0);
}

#[test]
fn starting_an_unknown_or_empty_quiz_fails_cleanly() {
    let workspace = temp_dir("quizd-attempt-missing");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "attempt.start",
        json!({ "quizId": "qz-missing", "studentName": "Ada" }),
    );
    assert_eq!(resp["error"]["code"], "not_found");
}
