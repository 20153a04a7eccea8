use serde::{Deserialize, Serialize};

/// A single multiple-choice question in the pool. `correct_answer` always
/// equals one of `options`; the draft editor enforces that before anything
/// reaches the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub quiz_id: String,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub marks: f64,
    pub time_limit_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub question_ids: Vec<String>,
    pub time_limit_minutes: u32,
    pub negative_marking: bool,
    pub competition_mode: bool,
}

/// One scored answer within an attempt, keyed by question id. Entries are
/// upserted when a student revisits a question, never duplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptAnswer {
    pub question_id: String,
    pub selected_answer: String,
    pub is_correct: bool,
    pub marks_obtained: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: String,
    pub quiz_id: String,
    pub student_name: String,
    pub score: f64,
    pub total_questions: u32,
    pub answers: Vec<AttemptAnswer>,
    /// Wall-clock millis at submission.
    pub timestamp: i64,
    pub time_taken_seconds: u64,
}
