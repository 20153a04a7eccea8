use crate::draft::{MAX_OPTIONS, MIN_OPTIONS};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::mock;
use serde_json::json;

/// Parses the shared topic/difficulty/count/options quartet used by both
/// `questions.generate` and `draft.loadGenerated`.
pub fn parse_generation_params(
    params: &serde_json::Value,
) -> Result<(String, String, usize, usize), (&'static str, String)> {
    let topic = params
        .get("topic")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or_default();
    if topic.is_empty() {
        return Err(("bad_params", "missing or empty topic".to_string()));
    }
    let difficulty = params
        .get("difficulty")
        .and_then(|v| v.as_str())
        .unwrap_or("Medium");
    let count = params.get("count").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
    if count < 1 {
        return Err(("bad_params", "count must be at least 1".to_string()));
    }
    let options_per_question = params
        .get("optionsPerQuestion")
        .and_then(|v| v.as_u64())
        .unwrap_or(4) as usize;
    if options_per_question < MIN_OPTIONS || options_per_question > MAX_OPTIONS {
        return Err((
            "bad_params",
            format!(
                "optionsPerQuestion must be between {} and {}",
                MIN_OPTIONS, MAX_OPTIONS
            ),
        ));
    }
    Ok((
        topic.to_string(),
        difficulty.to_string(),
        count,
        options_per_question,
    ))
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(repo) = state.repo.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match serde_json::to_value(repo.questions()) {
        Ok(questions) => ok(&req.id, json!({ "questions": questions })),
        Err(e) => err(&req.id, "encode_failed", e.to_string(), None),
    }
}

fn handle_generate(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.repo.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }
    let (topic, difficulty, count, options_per_question) =
        match parse_generation_params(&req.params) {
            Ok(parsed) => parsed,
            Err((code, message)) => return err(&req.id, code, message, None),
        };

    let generated = mock::generate_questions(&topic, &difficulty, count, options_per_question);
    match serde_json::to_value(&generated) {
        Ok(questions) => ok(
            &req.id,
            json!({
                "topic": topic,
                "difficulty": difficulty,
                "questions": questions
            }),
        ),
        Err(e) => err(&req.id, "encode_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "questions.list" => Some(handle_list(state, req)),
        "questions.generate" => Some(handle_generate(state, req)),
        _ => None,
    }
}
