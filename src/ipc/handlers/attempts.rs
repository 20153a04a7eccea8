use crate::attempt::{Advance, AttemptError, AttemptRunner, Tick};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::Question;
use crate::repo::{mint_id, NewAttempt, QuizRepo};
use serde_json::json;
use tracing::warn;

fn attempt_err(id: &str, e: AttemptError) -> serde_json::Value {
    err(id, e.code(), e.message(), None)
}

/// What the shell needs to render a question. The correct answer stays on
/// the daemon side until the review summary.
fn question_view(q: &Question) -> serde_json::Value {
    json!({
        "id": q.id,
        "questionText": q.question_text,
        "options": q.options,
        "marks": q.marks,
        "timeLimitMinutes": q.time_limit_minutes,
    })
}

fn persist_attempt(repo: &mut QuizRepo, record: NewAttempt) -> anyhow::Result<String> {
    let attempt_id = repo.submit_attempt(record);
    repo.save_attempts()?;
    Ok(attempt_id)
}

fn session_id<'a>(req: &'a Request) -> Option<&'a str> {
    req.params.get("sessionId").and_then(|v| v.as_str())
}

fn handle_start(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(repo) = state.repo.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(quiz_id) = req.params.get("quizId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing quizId", None);
    };
    let Some(quiz) = repo.quiz_by_id(quiz_id).cloned() else {
        return err(
            &req.id,
            "not_found",
            "quiz not found",
            Some(json!({ "quizId": quiz_id })),
        );
    };
    let questions = repo.questions_for_quiz(quiz_id);
    if questions.is_empty() {
        return err(
            &req.id,
            "quiz_empty",
            format!("quiz \"{}\" has no questions yet", quiz.title),
            Some(json!({ "quizId": quiz_id })),
        );
    }

    let student_name = req
        .params
        .get("studentName")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let runner = AttemptRunner::new(&quiz, questions, student_name);
    let session = mint_id("run");
    let response = ok(
        &req.id,
        json!({
            "sessionId": session,
            "quizId": quiz.id,
            "title": quiz.title,
            "timeLeft": runner.time_left(),
            "totalQuestions": runner.total_questions(),
            "currentIndex": runner.current_index(),
            "negativeMarking": quiz.negative_marking,
            "competitionMode": quiz.competition_mode,
            "question": question_view(runner.current_question()),
        }),
    );
    state.runners.insert(session, runner);
    response
}

fn handle_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = session_id(req) else {
        return err(&req.id, "bad_params", "missing sessionId", None);
    };
    let Some(answer) = req.params.get("answer").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing answer", None);
    };
    let Some(runner) = state.runners.get_mut(session) else {
        return err(&req.id, "not_found", "unknown attempt session", None);
    };
    match runner.select(answer.to_string()) {
        Ok(()) => ok(&req.id, json!({ "selected": answer })),
        Err(e) => attempt_err(&req.id, e),
    }
}

fn handle_next(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = session_id(req) else {
        return err(&req.id, "bad_params", "missing sessionId", None);
    };
    let Some(runner) = state.runners.get_mut(session) else {
        return err(&req.id, "not_found", "unknown attempt session", None);
    };
    match runner.next() {
        Ok(Advance::Moved { index, selected }) => ok(
            &req.id,
            json!({
                "finished": false,
                "currentIndex": index,
                "selected": selected,
                "question": question_view(runner.current_question()),
            }),
        ),
        Ok(Advance::Finished(record)) => {
            let summary = runner.summary();
            let Some(repo) = state.repo.as_mut() else {
                return err(&req.id, "no_workspace", "select a workspace first", None);
            };
            match persist_attempt(repo, record) {
                Ok(attempt_id) => ok(
                    &req.id,
                    json!({
                        "finished": true,
                        "attemptId": attempt_id,
                        "summary": summary,
                    }),
                ),
                Err(e) => {
                    warn!(error = %e, "failed to persist attempt");
                    err(&req.id, "storage_write_failed", e.to_string(), None)
                }
            }
        }
        Err(e) => attempt_err(&req.id, e),
    }
}

fn handle_previous(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = session_id(req) else {
        return err(&req.id, "bad_params", "missing sessionId", None);
    };
    let Some(runner) = state.runners.get_mut(session) else {
        return err(&req.id, "not_found", "unknown attempt session", None);
    };
    match runner.previous() {
        Ok(index) => ok(
            &req.id,
            json!({
                "currentIndex": index,
                "selected": runner.selected_answer(),
                "question": question_view(runner.current_question()),
            }),
        ),
        Err(e) => attempt_err(&req.id, e),
    }
}

fn handle_tick(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = session_id(req) else {
        return err(&req.id, "bad_params", "missing sessionId", None);
    };
    let Some(runner) = state.runners.get_mut(session) else {
        return err(&req.id, "not_found", "unknown attempt session", None);
    };
    match runner.tick() {
        Ok(Tick::Running { time_left }) => {
            ok(&req.id, json!({ "finished": false, "timeLeft": time_left }))
        }
        Ok(Tick::Expired(record)) => {
            let summary = runner.summary();
            let Some(repo) = state.repo.as_mut() else {
                return err(&req.id, "no_workspace", "select a workspace first", None);
            };
            match persist_attempt(repo, record) {
                Ok(attempt_id) => ok(
                    &req.id,
                    json!({
                        "finished": true,
                        "autoSubmit": true,
                        "attemptId": attempt_id,
                        "summary": summary,
                    }),
                ),
                Err(e) => {
                    warn!(error = %e, "failed to persist attempt");
                    err(&req.id, "storage_write_failed", e.to_string(), None)
                }
            }
        }
        Err(e @ AttemptError::StudentNameMissing) => {
            // Expired with no name on file: the runner stays pinned at zero
            // until the shell supplies one (see attempt.submit).
            err(
                &req.id,
                e.code(),
                e.message(),
                Some(json!({ "timeLeft": 0, "autoSubmit": true })),
            )
        }
        Err(e) => attempt_err(&req.id, e),
    }
}

fn handle_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = session_id(req) else {
        return err(&req.id, "bad_params", "missing sessionId", None);
    };
    let Some(runner) = state.runners.get_mut(session) else {
        return err(&req.id, "not_found", "unknown attempt session", None);
    };
    if let Some(name) = req.params.get("studentName").and_then(|v| v.as_str()) {
        runner.set_student_name(name.to_string());
    }
    match runner.submit() {
        Ok(record) => {
            let summary = runner.summary();
            let Some(repo) = state.repo.as_mut() else {
                return err(&req.id, "no_workspace", "select a workspace first", None);
            };
            match persist_attempt(repo, record) {
                Ok(attempt_id) => ok(
                    &req.id,
                    json!({
                        "finished": true,
                        "attemptId": attempt_id,
                        "summary": summary,
                    }),
                ),
                Err(e) => {
                    warn!(error = %e, "failed to persist attempt");
                    err(&req.id, "storage_write_failed", e.to_string(), None)
                }
            }
        }
        Err(e) => attempt_err(&req.id, e),
    }
}

fn handle_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = session_id(req) else {
        return err(&req.id, "bad_params", "missing sessionId", None);
    };
    let Some(runner) = state.runners.get(session) else {
        return err(&req.id, "not_found", "unknown attempt session", None);
    };
    match runner.summary() {
        Some(summary) => ok(&req.id, json!({ "summary": summary })),
        None => err(&req.id, "not_finished", "the attempt is still in progress", None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attempt.start" => Some(handle_start(state, req)),
        "attempt.select" => Some(handle_select(state, req)),
        "attempt.next" => Some(handle_next(state, req)),
        "attempt.previous" => Some(handle_previous(state, req)),
        "attempt.tick" => Some(handle_tick(state, req)),
        "attempt.submit" => Some(handle_submit(state, req)),
        "attempt.summary" => Some(handle_summary(state, req)),
        _ => None,
    }
}
