use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::leaderboard;
use serde_json::json;

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(repo) = state.repo.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let boards = leaderboard::build(repo.quizzes(), repo.attempts());
    match serde_json::to_value(&boards) {
        Ok(value) => ok(&req.id, json!({ "boards": value })),
        Err(e) => err(&req.id, "encode_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "leaderboard.get" => Some(handle_get(state, req)),
        _ => None,
    }
}
