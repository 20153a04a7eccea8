use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::repo::QuizMeta;
use serde_json::json;
use tracing::warn;

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(repo) = state.repo.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match serde_json::to_value(repo.quizzes()) {
        Ok(quizzes) => ok(&req.id, json!({ "quizzes": quizzes })),
        Err(e) => err(&req.id, "encode_failed", e.to_string(), None),
    }
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(repo) = state.repo.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(quiz_id) = req.params.get("quizId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing quizId", None);
    };
    match repo.quiz_by_id(quiz_id) {
        Some(quiz) => match serde_json::to_value(quiz) {
            Ok(value) => ok(&req.id, json!({ "quiz": value })),
            Err(e) => err(&req.id, "encode_failed", e.to_string(), None),
        },
        None => err(
            &req.id,
            "not_found",
            "quiz not found",
            Some(json!({ "quizId": quiz_id })),
        ),
    }
}

fn handle_questions(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(repo) = state.repo.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(quiz_id) = req.params.get("quizId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing quizId", None);
    };
    if repo.quiz_by_id(quiz_id).is_none() {
        return err(
            &req.id,
            "not_found",
            "quiz not found",
            Some(json!({ "quizId": quiz_id })),
        );
    }
    match serde_json::to_value(repo.questions_for_quiz(quiz_id)) {
        Ok(questions) => ok(&req.id, json!({ "questions": questions })),
        Err(e) => err(&req.id, "encode_failed", e.to_string(), None),
    }
}

/// Composes a quiz from existing pool questions. Unlike the repository
/// contract, this commit path enforces referential integrity: every
/// referenced question id must resolve before the quiz is created.
fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(repo) = state.repo.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let title = req
        .params
        .get("title")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or_default();
    if title.is_empty() {
        return err(&req.id, "bad_params", "quiz title must not be empty", None);
    }
    let time_limit_minutes = req
        .params
        .get("timeLimitMinutes")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;
    if time_limit_minutes < 1 {
        return err(
            &req.id,
            "bad_params",
            "quiz time limit must be at least 1 minute",
            None,
        );
    }
    let question_ids: Vec<String> = req
        .params
        .get("questionIds")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();
    if question_ids.is_empty() {
        return err(
            &req.id,
            "bad_params",
            "select at least one question",
            None,
        );
    }

    let missing: Vec<&String> = question_ids
        .iter()
        .filter(|id| !repo.questions().iter().any(|q| q.id == **id))
        .collect();
    if !missing.is_empty() {
        return err(
            &req.id,
            "unknown_question",
            "quiz references questions that do not exist",
            Some(json!({ "questionIds": missing })),
        );
    }

    let meta = QuizMeta {
        title: title.to_string(),
        time_limit_minutes,
        negative_marking: req
            .params
            .get("negativeMarking")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        competition_mode: req
            .params
            .get("competitionMode")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
    };
    let quiz_id = repo.add_quiz(meta, question_ids);
    if let Err(e) = repo.save_quizzes() {
        warn!(error = %e, "failed to persist quizzes");
        return err(&req.id, "storage_write_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "quizId": quiz_id }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "quizzes.list" => Some(handle_list(state, req)),
        "quizzes.get" => Some(handle_get(state, req)),
        "quizzes.questions" => Some(handle_questions(state, req)),
        "quizzes.create" => Some(handle_create(state, req)),
        _ => None,
    }
}
