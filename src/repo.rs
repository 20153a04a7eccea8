use crate::model::{AttemptAnswer, Question, Quiz, QuizAttempt};
use crate::store;
use chrono::Utc;
use rusqlite::Connection;
use tracing::warn;
use uuid::Uuid;

/// Input for `add_question`. The repository performs no validation here;
/// callers (the draft editor commit path) are responsible for it.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub quiz_id: String,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub marks: f64,
    pub time_limit_minutes: u32,
}

#[derive(Debug, Clone)]
pub struct QuizMeta {
    pub title: String,
    pub time_limit_minutes: u32,
    pub negative_marking: bool,
    pub competition_mode: bool,
}

#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub quiz_id: String,
    pub student_name: String,
    pub score: f64,
    pub total_questions: u32,
    pub answers: Vec<AttemptAnswer>,
    pub time_taken_seconds: u64,
}

/// Ids are `<prefix>-<wall-clock-millis>-<random-suffix>`. Uniqueness is
/// probabilistic; collisions at human interaction rates are not a concern.
pub fn mint_id(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", prefix, millis, &suffix[..9])
}

/// Owns the three domain collections. Mutations touch memory only; callers
/// flush with the matching `save_*` so write timing and failures stay visible.
/// A failed flush leaves memory ahead of storage until the next successful
/// write; there is no rollback.
pub struct QuizRepo {
    conn: Connection,
    questions: Vec<Question>,
    quizzes: Vec<Quiz>,
    attempts: Vec<QuizAttempt>,
}

impl QuizRepo {
    /// Loads all collections from the store. A missing or unreadable key
    /// falls back to an empty collection; nothing here is fatal.
    pub fn load(conn: Connection) -> Self {
        let questions = load_collection(&conn, store::KEY_QUESTIONS);
        let quizzes = load_collection(&conn, store::KEY_QUIZZES);
        let attempts = load_collection(&conn, store::KEY_ATTEMPTS);
        Self {
            conn,
            questions,
            quizzes,
            attempts,
        }
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn quizzes(&self) -> &[Quiz] {
        &self.quizzes
    }

    pub fn attempts(&self) -> &[QuizAttempt] {
        &self.attempts
    }

    pub fn add_question(&mut self, new: NewQuestion) -> String {
        let id = mint_id("q");
        self.questions.push(Question {
            id: id.clone(),
            quiz_id: new.quiz_id,
            question_text: new.question_text,
            options: new.options,
            correct_answer: new.correct_answer,
            marks: new.marks,
            time_limit_minutes: new.time_limit_minutes,
        });
        id
    }

    /// Appends the quiz as given. Whether the referenced question ids resolve
    /// is not checked at this layer; the commit handlers enforce it.
    pub fn add_quiz(&mut self, meta: QuizMeta, question_ids: Vec<String>) -> String {
        let id = mint_id("qz");
        self.quizzes.push(Quiz {
            id: id.clone(),
            title: meta.title,
            question_ids,
            time_limit_minutes: meta.time_limit_minutes,
            negative_marking: meta.negative_marking,
            competition_mode: meta.competition_mode,
        });
        id
    }

    /// Append-only; a student submitting the same quiz twice produces two
    /// rows on the leaderboard.
    pub fn submit_attempt(&mut self, new: NewAttempt) -> String {
        let id = mint_id("att");
        self.attempts.push(QuizAttempt {
            id: id.clone(),
            quiz_id: new.quiz_id,
            student_name: new.student_name,
            score: new.score,
            total_questions: new.total_questions,
            answers: new.answers,
            timestamp: Utc::now().timestamp_millis(),
            time_taken_seconds: new.time_taken_seconds,
        });
        id
    }

    pub fn quiz_by_id(&self, quiz_id: &str) -> Option<&Quiz> {
        self.quizzes.iter().find(|q| q.id == quiz_id)
    }

    /// Returns the quiz's questions in pool-insertion order, not in
    /// `question_ids` order. Preserved from the original behavior; the
    /// authored sequence is not necessarily the presented sequence.
    pub fn questions_for_quiz(&self, quiz_id: &str) -> Vec<Question> {
        let Some(quiz) = self.quiz_by_id(quiz_id) else {
            return Vec::new();
        };
        self.questions
            .iter()
            .filter(|q| quiz.question_ids.iter().any(|id| *id == q.id))
            .cloned()
            .collect()
    }

    pub fn save_questions(&self) -> anyhow::Result<()> {
        let value = serde_json::to_value(&self.questions)?;
        store::kv_set_json(&self.conn, store::KEY_QUESTIONS, &value)
    }

    pub fn save_quizzes(&self) -> anyhow::Result<()> {
        let value = serde_json::to_value(&self.quizzes)?;
        store::kv_set_json(&self.conn, store::KEY_QUIZZES, &value)
    }

    pub fn save_attempts(&self) -> anyhow::Result<()> {
        let value = serde_json::to_value(&self.attempts)?;
        store::kv_set_json(&self.conn, store::KEY_ATTEMPTS, &value)
    }
}

fn load_collection<T: serde::de::DeserializeOwned>(conn: &Connection, key: &str) -> Vec<T> {
    match store::kv_get_json(conn, key) {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(items) => items,
            Err(e) => {
                warn!(key, error = %e, "stored collection is unreadable, starting empty");
                Vec::new()
            }
        },
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!(key, error = %e, "failed to read stored collection, starting empty");
            Vec::new()
        }
    }
}
