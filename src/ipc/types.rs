use std::collections::HashMap;
use std::path::PathBuf;

use crate::attempt::AttemptRunner;
use crate::draft::DraftEditor;
use crate::repo::QuizRepo;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub repo: Option<QuizRepo>,
    /// The teacher's staging editor. Always present; starts in the
    /// configuration phase and is restored from the workspace snapshot on
    /// `workspace.select`.
    pub draft: DraftEditor,
    /// In-flight attempt runners keyed by session id. In-memory only; an
    /// abandoned session leaves no record.
    pub runners: HashMap<String, AttemptRunner>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            repo: None,
            draft: DraftEditor::default(),
            runners: HashMap::new(),
        }
    }
}
