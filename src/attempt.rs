use crate::model::{AttemptAnswer, Question, Quiz};
use crate::repo::NewAttempt;
use serde::Serialize;

/// Penalty factor applied to a wrong answer when the quiz has negative
/// marking enabled.
const NEGATIVE_MARKING_FACTOR: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptError {
    AlreadyFinished,
    NoSelection,
    AtFirstQuestion,
    StudentNameMissing,
}

impl AttemptError {
    pub fn code(&self) -> &'static str {
        match self {
            AttemptError::AlreadyFinished => "already_finished",
            AttemptError::NoSelection => "no_selection",
            AttemptError::AtFirstQuestion => "at_first_question",
            AttemptError::StudentNameMissing => "student_name_missing",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AttemptError::AlreadyFinished => "the attempt is already submitted",
            AttemptError::NoSelection => "select an answer before proceeding",
            AttemptError::AtFirstQuestion => "already at the first question",
            AttemptError::StudentNameMissing => "enter a student name to submit",
        }
    }
}

/// Outcome of `next`.
#[derive(Debug)]
pub enum Advance {
    /// Moved to the question at `index`; `selected` is the previously
    /// recorded answer for it, if the student has been here before.
    Moved {
        index: usize,
        selected: Option<String>,
    },
    /// The last question was answered and the attempt is submitted.
    Finished(NewAttempt),
}

/// Outcome of one timer tick.
#[derive(Debug)]
pub enum Tick {
    Running { time_left: u64 },
    /// The budget ran out and the attempt auto-submitted.
    Expired(NewAttempt),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    pub question_id: String,
    pub question_text: String,
    pub selected_answer: String,
    pub is_correct: bool,
    pub marks_obtained: f64,
    /// Shown only for wrong answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    pub quiz_id: String,
    pub student_name: String,
    pub score: f64,
    pub total_questions: u32,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub time_taken_seconds: u64,
    pub auto_submitted: bool,
    /// Surfaced only for competition-mode quizzes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<u64>,
    pub review: Vec<ReviewEntry>,
}

/// The scoring/timer state machine for one student run through a quiz.
///
/// Transitions happen on discrete events only: a selection, next/previous,
/// one tick per wall-clock second, or a manual submit. Once finished no
/// further transition is possible. The runner is pure state; the produced
/// `NewAttempt` is handed to the repository by the caller.
pub struct AttemptRunner {
    quiz_id: String,
    negative_marking: bool,
    competition_mode: bool,
    questions: Vec<Question>,
    student_name: String,
    current_index: usize,
    selected_answer: Option<String>,
    answers: Vec<AttemptAnswer>,
    initial_seconds: u64,
    time_left: u64,
    finished: bool,
    auto_submitted: bool,
    final_score: f64,
    final_time_taken: u64,
}

impl AttemptRunner {
    /// `questions` is the quiz's question sequence as the repository returns
    /// it; callers must not pass an empty sequence.
    pub fn new(quiz: &Quiz, questions: Vec<Question>, student_name: String) -> Self {
        let initial_seconds = u64::from(quiz.time_limit_minutes) * 60;
        Self {
            quiz_id: quiz.id.clone(),
            negative_marking: quiz.negative_marking,
            competition_mode: quiz.competition_mode,
            questions,
            student_name,
            current_index: 0,
            selected_answer: None,
            answers: Vec::new(),
            initial_seconds,
            time_left: initial_seconds,
            finished: false,
            auto_submitted: false,
            final_score: 0.0,
            final_time_taken: 0,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.current_index]
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn selected_answer(&self) -> Option<&str> {
        self.selected_answer.as_deref()
    }

    pub fn time_left(&self) -> u64 {
        self.time_left
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn set_student_name(&mut self, name: String) {
        self.student_name = name;
    }

    pub fn select(&mut self, answer: String) -> Result<(), AttemptError> {
        if self.finished {
            return Err(AttemptError::AlreadyFinished);
        }
        self.selected_answer = Some(answer);
        Ok(())
    }

    /// Records the current selection and advances; on the last question this
    /// triggers submission instead. Rejected without a selection, leaving all
    /// state unchanged.
    pub fn next(&mut self) -> Result<Advance, AttemptError> {
        if self.finished {
            return Err(AttemptError::AlreadyFinished);
        }
        let Some(selected) = self.selected_answer.clone() else {
            return Err(AttemptError::NoSelection);
        };
        self.record(selected);

        if self.current_index + 1 < self.questions.len() {
            self.current_index += 1;
            self.selected_answer = self.recorded_for_current();
            Ok(Advance::Moved {
                index: self.current_index,
                selected: self.selected_answer.clone(),
            })
        } else {
            let record = self.finish(false)?;
            Ok(Advance::Finished(record))
        }
    }

    /// Steps back one question; the shown selection is re-derived from the
    /// recorded entry, never cleared. A selection that was never advanced
    /// past is dropped here (it only counts once advanced or at submission).
    pub fn previous(&mut self) -> Result<usize, AttemptError> {
        if self.finished {
            return Err(AttemptError::AlreadyFinished);
        }
        if self.current_index == 0 {
            return Err(AttemptError::AtFirstQuestion);
        }
        self.current_index -= 1;
        self.selected_answer = self.recorded_for_current();
        Ok(self.current_index)
    }

    /// One wall-clock second. At zero the attempt force-submits, selection or
    /// not. When the student name is still missing the submission is refused
    /// and the runner stays at zero; a later tick retries once the name is
    /// set, so auto-submit still happens exactly once.
    pub fn tick(&mut self) -> Result<Tick, AttemptError> {
        if self.finished {
            return Err(AttemptError::AlreadyFinished);
        }
        if self.time_left > 0 {
            self.time_left -= 1;
        }
        if self.time_left == 0 {
            let record = self.finish(true)?;
            Ok(Tick::Expired(record))
        } else {
            Ok(Tick::Running {
                time_left: self.time_left,
            })
        }
    }

    /// Manual submission from any question.
    pub fn submit(&mut self) -> Result<NewAttempt, AttemptError> {
        if self.finished {
            return Err(AttemptError::AlreadyFinished);
        }
        self.finish(false)
    }

    /// Available once the runner is finished.
    pub fn summary(&self) -> Option<AttemptSummary> {
        if !self.finished {
            return None;
        }
        let correct_count = self.answers.iter().filter(|a| a.is_correct).count() as u32;
        let review = self
            .answers
            .iter()
            .map(|a| {
                let question = self
                    .questions
                    .iter()
                    .find(|q| q.id == a.question_id)
                    .expect("answer entries only exist for known questions");
                ReviewEntry {
                    question_id: a.question_id.clone(),
                    question_text: question.question_text.clone(),
                    selected_answer: a.selected_answer.clone(),
                    is_correct: a.is_correct,
                    marks_obtained: a.marks_obtained,
                    correct_answer: if a.is_correct {
                        None
                    } else {
                        Some(question.correct_answer.clone())
                    },
                }
            })
            .collect();

        Some(AttemptSummary {
            quiz_id: self.quiz_id.clone(),
            student_name: self.student_name.clone(),
            score: self.final_score,
            total_questions: self.questions.len() as u32,
            correct_count,
            incorrect_count: self.answers.len() as u32 - correct_count,
            time_taken_seconds: self.final_time_taken,
            auto_submitted: self.auto_submitted,
            elapsed_seconds: self.competition_mode.then_some(self.final_time_taken),
            review,
        })
    }

    /// Scores and upserts the entry for the current question. Revisits
    /// replace the prior entry, so a question never counts twice.
    fn record(&mut self, selected: String) {
        let question = &self.questions[self.current_index];
        let is_correct = selected == question.correct_answer;
        let marks_obtained = if is_correct {
            question.marks
        } else if self.negative_marking {
            -NEGATIVE_MARKING_FACTOR * question.marks
        } else {
            0.0
        };
        let entry = AttemptAnswer {
            question_id: question.id.clone(),
            selected_answer: selected,
            is_correct,
            marks_obtained,
        };
        if let Some(existing) = self
            .answers
            .iter_mut()
            .find(|a| a.question_id == entry.question_id)
        {
            *existing = entry;
        } else {
            self.answers.push(entry);
        }
    }

    fn recorded_for_current(&self) -> Option<String> {
        let id = &self.questions[self.current_index].id;
        self.answers
            .iter()
            .find(|a| a.question_id == *id)
            .map(|a| a.selected_answer.clone())
    }

    fn finish(&mut self, auto: bool) -> Result<NewAttempt, AttemptError> {
        if self.student_name.trim().is_empty() {
            return Err(AttemptError::StudentNameMissing);
        }
        // Finalize the in-progress question if a selection is pending.
        if let Some(selected) = self.selected_answer.clone() {
            self.record(selected);
        }
        self.final_score = self.answers.iter().map(|a| a.marks_obtained).sum();
        self.final_time_taken = self.initial_seconds - self.time_left;
        self.finished = true;
        self.auto_submitted = auto;
        Ok(NewAttempt {
            quiz_id: self.quiz_id.clone(),
            student_name: self.student_name.clone(),
            score: self.final_score,
            total_questions: self.questions.len() as u32,
            answers: self.answers.clone(),
            time_taken_seconds: self.final_time_taken,
        })
    }
}
