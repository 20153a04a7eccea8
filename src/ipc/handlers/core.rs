use crate::draft::DraftEditor;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::repo::QuizRepo;
use crate::store;
use serde_json::json;
use std::path::PathBuf;
use tracing::warn;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match store::open_store(&path) {
        Ok(conn) => {
            // Best-effort: restore the teacher's in-progress draft. A missing
            // or unreadable snapshot must not prevent the workspace from
            // opening.
            let draft = match store::kv_get_json(&conn, store::KEY_ACTIVE_DRAFT) {
                Ok(Some(value)) => match serde_json::from_value::<DraftEditor>(value) {
                    Ok(editor) => editor,
                    Err(e) => {
                        warn!(error = %e, "draft snapshot is unreadable, starting fresh");
                        DraftEditor::default()
                    }
                },
                Ok(None) => DraftEditor::default(),
                Err(e) => {
                    warn!(error = %e, "failed to read draft snapshot, starting fresh");
                    DraftEditor::default()
                }
            };

            let repo = QuizRepo::load(conn);
            state.workspace = Some(path.clone());
            state.repo = Some(repo);
            state.draft = draft;
            // Runners referenced the previous workspace's data.
            state.runners.clear();
            ok(&req.id, json!({ "workspacePath": path.to_string_lossy() }))
        }
        Err(e) => err(&req.id, "store_open_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
