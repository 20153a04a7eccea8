use crate::draft::DraftError;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::questions::parse_generation_params;
use crate::ipc::types::{AppState, Request};
use crate::mock;
use crate::repo::QuizMeta;
use crate::store;
use serde_json::json;
use tracing::warn;

fn draft_err(id: &str, e: DraftError) -> serde_json::Value {
    let details = json!({ "field": e.field, "block": e.block });
    err(id, "draft_invalid", e.message, Some(details))
}

fn draft_json(state: &AppState) -> serde_json::Value {
    serde_json::to_value(&state.draft).unwrap_or_else(|_| json!({}))
}

/// Best-effort snapshot of the in-progress draft under
/// `activeCreationSession`. Snapshot failures never fail the edit itself.
fn snapshot(state: &AppState) {
    let Some(repo) = state.repo.as_ref() else {
        return;
    };
    match serde_json::to_value(&state.draft) {
        Ok(value) => {
            if let Err(e) = store::kv_set_json(repo.conn(), store::KEY_ACTIVE_DRAFT, &value) {
                warn!(error = %e, "failed to snapshot draft");
            }
        }
        Err(e) => warn!(error = %e, "failed to encode draft snapshot"),
    }
}

fn clear_snapshot(state: &AppState) {
    if let Some(repo) = state.repo.as_ref() {
        if let Err(e) = store::kv_delete(repo.conn(), store::KEY_ACTIVE_DRAFT) {
            warn!(error = %e, "failed to clear draft snapshot");
        }
    }
}

fn require_workspace(state: &AppState, req: &Request) -> Option<serde_json::Value> {
    if state.repo.is_none() {
        return Some(err(&req.id, "no_workspace", "select a workspace first", None));
    }
    None
}

fn counts(req: &Request) -> Result<(usize, usize), serde_json::Value> {
    let question_count = req
        .params
        .get("questionCount")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| err(&req.id, "bad_params", "missing questionCount", None))?;
    let options_per_question = req
        .params
        .get("optionsPerQuestion")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| err(&req.id, "bad_params", "missing optionsPerQuestion", None))?;
    Ok((question_count as usize, options_per_question as usize))
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(resp) = require_workspace(state, req) {
        return resp;
    }
    ok(&req.id, json!({ "draft": draft_json(state) }))
}

fn handle_configure(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(resp) = require_workspace(state, req) {
        return resp;
    }
    let (question_count, options_per_question) = match counts(req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    if let Err(e) = state.draft.configure(question_count, options_per_question) {
        return draft_err(&req.id, e);
    }
    snapshot(state);
    ok(&req.id, json!({ "draft": draft_json(state) }))
}

fn handle_resize(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(resp) = require_workspace(state, req) {
        return resp;
    }
    let (question_count, options_per_question) = match counts(req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    if let Err(e) = state.draft.resize(question_count, options_per_question) {
        return draft_err(&req.id, e);
    }
    snapshot(state);
    ok(&req.id, json!({ "draft": draft_json(state) }))
}

fn handle_update_block(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(resp) = require_workspace(state, req) {
        return resp;
    }
    let Some(index) = req.params.get("index").and_then(|v| v.as_u64()) else {
        return err(&req.id, "bad_params", "missing index", None);
    };
    let index = index as usize;
    let Some(field) = req.params.get("field").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing field", None);
    };
    let value = req.params.get("value");

    let result = match field {
        "questionText" => {
            let Some(text) = value.and_then(|v| v.as_str()) else {
                return err(&req.id, "bad_params", "questionText needs a string value", None);
            };
            state.draft.set_question_text(index, text.to_string())
        }
        "option" => {
            let Some(slot) = req.params.get("slot").and_then(|v| v.as_u64()) else {
                return err(&req.id, "bad_params", "option edits need a slot", None);
            };
            let Some(text) = value.and_then(|v| v.as_str()) else {
                return err(&req.id, "bad_params", "option needs a string value", None);
            };
            state
                .draft
                .set_option(index, slot as usize, text.to_string())
        }
        "correctAnswer" => {
            let Some(answer) = value.and_then(|v| v.as_str()) else {
                return err(&req.id, "bad_params", "correctAnswer needs a string value", None);
            };
            state.draft.select_correct(index, answer.to_string())
        }
        "marks" => {
            let Some(marks) = value.and_then(|v| v.as_f64()) else {
                return err(&req.id, "bad_params", "marks needs a numeric value", None);
            };
            state.draft.set_marks(index, marks)
        }
        "timeLimitMinutes" => {
            // null clears the per-question limit.
            let limit = match value {
                Some(v) if v.is_null() => None,
                Some(v) => match v.as_u64() {
                    Some(n) => Some(n as u32),
                    None => {
                        return err(
                            &req.id,
                            "bad_params",
                            "timeLimitMinutes needs a number or null",
                            None,
                        )
                    }
                },
                None => None,
            };
            state.draft.set_time_limit(index, limit)
        }
        other => {
            return err(
                &req.id,
                "bad_params",
                format!("unknown field: {}", other),
                None,
            )
        }
    };

    if let Err(e) = result {
        return draft_err(&req.id, e);
    }
    snapshot(state);
    ok(&req.id, json!({ "draft": draft_json(state) }))
}

fn handle_delete_block(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(resp) = require_workspace(state, req) {
        return resp;
    }
    let Some(index) = req.params.get("index").and_then(|v| v.as_u64()) else {
        return err(&req.id, "bad_params", "missing index", None);
    };
    if let Err(e) = state.draft.delete_block(index as usize) {
        return draft_err(&req.id, e);
    }
    snapshot(state);
    ok(&req.id, json!({ "draft": draft_json(state) }))
}

fn handle_load_generated(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(resp) = require_workspace(state, req) {
        return resp;
    }
    let (topic, difficulty, count, options_per_question) =
        match parse_generation_params(&req.params) {
            Ok(parsed) => parsed,
            Err((code, message)) => return err(&req.id, code, message, None),
        };
    let generated = mock::generate_questions(&topic, &difficulty, count, options_per_question);
    if let Err(e) = state.draft.load_generated(generated) {
        return draft_err(&req.id, e);
    }
    snapshot(state);
    ok(&req.id, json!({ "draft": draft_json(state) }))
}

fn parse_quiz_meta(req: &Request) -> Result<Option<QuizMeta>, serde_json::Value> {
    let Some(quiz) = req.params.get("quiz") else {
        return Ok(None);
    };
    if quiz.is_null() {
        return Ok(None);
    }
    let title = quiz
        .get("title")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or_default();
    if title.is_empty() {
        return Err(err(&req.id, "bad_params", "quiz title must not be empty", None));
    }
    let time_limit_minutes = quiz
        .get("timeLimitMinutes")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;
    if time_limit_minutes < 1 {
        return Err(err(
            &req.id,
            "bad_params",
            "quiz time limit must be at least 1 minute",
            None,
        ));
    }
    Ok(Some(QuizMeta {
        title: title.to_string(),
        time_limit_minutes,
        negative_marking: quiz
            .get("negativeMarking")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        competition_mode: quiz
            .get("competitionMode")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
    }))
}

/// Commits the whole draft: every block becomes a pool question, optionally
/// followed by a quiz referencing all of them, then the staging state resets.
/// The first validation failure aborts the commit with nothing inserted.
fn handle_commit(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.repo.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }

    let inserts = match state.draft.validate() {
        Ok(inserts) => inserts,
        Err(e) => return draft_err(&req.id, e),
    };
    let quiz_meta = match parse_quiz_meta(req) {
        Ok(meta) => meta,
        Err(resp) => return resp,
    };

    let repo = state.repo.as_mut().expect("checked above");
    let question_ids: Vec<String> = inserts
        .into_iter()
        .map(|insert| repo.add_question(insert))
        .collect();
    if let Err(e) = repo.save_questions() {
        warn!(error = %e, "failed to persist questions");
        return err(&req.id, "storage_write_failed", e.to_string(), None);
    }

    let quiz_id = match quiz_meta {
        Some(meta) => {
            let id = repo.add_quiz(meta, question_ids.clone());
            if let Err(e) = repo.save_quizzes() {
                warn!(error = %e, "failed to persist quizzes");
                return err(&req.id, "storage_write_failed", e.to_string(), None);
            }
            Some(id)
        }
        None => None,
    };

    state.draft.reset();
    clear_snapshot(state);
    ok(
        &req.id,
        json!({ "questionIds": question_ids, "quizId": quiz_id }),
    )
}

fn handle_discard(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(resp) = require_workspace(state, req) {
        return resp;
    }
    state.draft.reset();
    clear_snapshot(state);
    ok(&req.id, json!({ "draft": draft_json(state) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "draft.get" => Some(handle_get(state, req)),
        "draft.configure" => Some(handle_configure(state, req)),
        "draft.resize" => Some(handle_resize(state, req)),
        "draft.updateBlock" => Some(handle_update_block(state, req)),
        "draft.deleteBlock" => Some(handle_delete_block(state, req)),
        "draft.loadGenerated" => Some(handle_load_generated(state, req)),
        "draft.commit" => Some(handle_commit(state, req)),
        "draft.discard" => Some(handle_discard(state, req)),
        _ => None,
    }
}
