use crate::model::{Quiz, QuizAttempt};
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    pub rank: u32,
    pub student_name: String,
    pub score: f64,
    pub total_questions: u32,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizBoard {
    pub quiz_id: String,
    pub title: String,
    pub rows: Vec<LeaderboardRow>,
}

/// Groups attempts by quiz (first-attempt order) and ranks each group by
/// score descending; ties keep submission order. Attempts whose quiz no
/// longer resolves are skipped rather than failing the whole projection.
pub fn build(quizzes: &[Quiz], attempts: &[QuizAttempt]) -> Vec<QuizBoard> {
    let mut boards: Vec<(String, Vec<&QuizAttempt>)> = Vec::new();
    for attempt in attempts {
        match boards.iter_mut().find(|(id, _)| *id == attempt.quiz_id) {
            Some((_, group)) => group.push(attempt),
            None => boards.push((attempt.quiz_id.clone(), vec![attempt])),
        }
    }

    boards
        .into_iter()
        .filter_map(|(quiz_id, mut group)| {
            let quiz = quizzes.iter().find(|q| q.id == quiz_id)?;
            group.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(Ordering::Equal)
            });
            let rows = group
                .into_iter()
                .enumerate()
                .map(|(i, attempt)| LeaderboardRow {
                    rank: i as u32 + 1,
                    student_name: attempt.student_name.clone(),
                    score: attempt.score,
                    total_questions: attempt.total_questions,
                    timestamp: attempt.timestamp,
                })
                .collect();
            Some(QuizBoard {
                quiz_id,
                title: quiz.title.clone(),
                rows,
            })
        })
        .collect()
}
