use crate::mock::GeneratedQuestion;
use crate::repo::NewQuestion;
use serde::{Deserialize, Serialize};

pub const MIN_QUESTIONS: usize = 1;
pub const MIN_OPTIONS: usize = 1;
pub const MAX_OPTIONS: usize = 6;

const DEFAULT_QUESTION_COUNT: usize = 1;
const DEFAULT_OPTIONS_PER_QUESTION: usize = 4;

/// A validation failure, pointing at the offending block/field so the shell
/// can focus the right input. The draft itself is left untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftError {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<usize>,
    pub message: String,
}

impl DraftError {
    fn config(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            block: None,
            message: message.into(),
        }
    }

    fn block(index: usize, field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            block: Some(index),
            message: message.into(),
        }
    }
}

/// One not-yet-committed question under edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftBlock {
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: Option<String>,
    pub marks: f64,
    pub time_limit_minutes: Option<u32>,
}

impl DraftBlock {
    fn blank(option_count: usize) -> Self {
        Self {
            question_text: String::new(),
            options: vec![String::new(); option_count],
            correct_answer: None,
            marks: 1.0,
            time_limit_minutes: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DraftPhase {
    Configuring,
    Drafting,
}

/// Teacher-side staging state machine. Starts in the configuration phase;
/// once the counts pass their bounds the configured number of blank blocks is
/// materialized and edits happen in place until commit or discard. The whole
/// editor serializes so the in-progress draft can be snapshotted to the store
/// and restored on the next workspace open.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftEditor {
    pub phase: DraftPhase,
    pub question_count: usize,
    pub options_per_question: usize,
    pub blocks: Vec<DraftBlock>,
}

impl Default for DraftEditor {
    fn default() -> Self {
        Self {
            phase: DraftPhase::Configuring,
            question_count: DEFAULT_QUESTION_COUNT,
            options_per_question: DEFAULT_OPTIONS_PER_QUESTION,
            blocks: Vec::new(),
        }
    }
}

fn check_bounds(question_count: usize, options_per_question: usize) -> Result<(), DraftError> {
    if question_count < MIN_QUESTIONS {
        return Err(DraftError::config(
            "questionCount",
            format!("need at least {} question", MIN_QUESTIONS),
        ));
    }
    if options_per_question < MIN_OPTIONS || options_per_question > MAX_OPTIONS {
        return Err(DraftError::config(
            "optionsPerQuestion",
            format!(
                "options per question must be between {} and {}",
                MIN_OPTIONS, MAX_OPTIONS
            ),
        ));
    }
    Ok(())
}

/// Pure reconciliation of an existing block array against new counts.
/// Post-conditions: the result has exactly `new_count` blocks of exactly
/// `new_option_count` options each; surviving content is untouched; growth
/// appends blanks; shrink truncates; and any block whose chosen correct
/// answer no longer appears among its surviving options has the selection
/// cleared so no dangling reference remains.
pub fn reconcile(
    blocks: &[DraftBlock],
    new_count: usize,
    new_option_count: usize,
) -> Vec<DraftBlock> {
    let mut result: Vec<DraftBlock> = blocks.iter().take(new_count).cloned().collect();
    while result.len() < new_count {
        result.push(DraftBlock::blank(new_option_count));
    }

    for block in &mut result {
        block.options.truncate(new_option_count);
        while block.options.len() < new_option_count {
            block.options.push(String::new());
        }
        if let Some(chosen) = &block.correct_answer {
            if !block.options.iter().any(|opt| opt == chosen) {
                block.correct_answer = None;
            }
        }
    }

    result
}

impl DraftEditor {
    /// Leaves the configuration phase, materializing the blank blocks. Out of
    /// bounds counts keep the phase and report the offending field.
    pub fn configure(
        &mut self,
        question_count: usize,
        options_per_question: usize,
    ) -> Result<(), DraftError> {
        check_bounds(question_count, options_per_question)?;
        self.question_count = question_count;
        self.options_per_question = options_per_question;
        self.blocks = (0..question_count)
            .map(|_| DraftBlock::blank(options_per_question))
            .collect();
        self.phase = DraftPhase::Drafting;
        Ok(())
    }

    /// Changes either count while drafting, reconciling the existing blocks.
    pub fn resize(
        &mut self,
        question_count: usize,
        options_per_question: usize,
    ) -> Result<(), DraftError> {
        self.require_drafting()?;
        check_bounds(question_count, options_per_question)?;
        self.blocks = reconcile(&self.blocks, question_count, options_per_question);
        self.question_count = question_count;
        self.options_per_question = options_per_question;
        Ok(())
    }

    pub fn set_question_text(&mut self, index: usize, text: String) -> Result<(), DraftError> {
        let block = self.block_mut(index)?;
        block.question_text = text;
        Ok(())
    }

    /// Rewrites one option slot. If the replaced text was the chosen correct
    /// answer and no other slot still carries it, the selection is cleared.
    pub fn set_option(&mut self, index: usize, slot: usize, text: String) -> Result<(), DraftError> {
        let block = self.block_mut(index)?;
        if slot >= block.options.len() {
            return Err(DraftError::block(index, "option", "no such option slot"));
        }
        block.options[slot] = text;
        if let Some(chosen) = &block.correct_answer {
            if !block.options.iter().any(|opt| opt == chosen) {
                block.correct_answer = None;
            }
        }
        Ok(())
    }

    /// Selects the correct answer; it must match one of the block's non-empty
    /// options.
    pub fn select_correct(&mut self, index: usize, answer: String) -> Result<(), DraftError> {
        let block = self.block_mut(index)?;
        if answer.is_empty() || !block.options.iter().any(|opt| *opt == answer) {
            return Err(DraftError::block(
                index,
                "correctAnswer",
                "correct answer must be one of the provided options",
            ));
        }
        block.correct_answer = Some(answer);
        Ok(())
    }

    pub fn set_marks(&mut self, index: usize, marks: f64) -> Result<(), DraftError> {
        let block = self.block_mut(index)?;
        block.marks = marks;
        Ok(())
    }

    pub fn set_time_limit(
        &mut self,
        index: usize,
        time_limit_minutes: Option<u32>,
    ) -> Result<(), DraftError> {
        let block = self.block_mut(index)?;
        block.time_limit_minutes = time_limit_minutes;
        Ok(())
    }

    /// Removes one block; `question_count` follows the remaining length. The
    /// last block cannot be deleted, the configured minimum still holds.
    pub fn delete_block(&mut self, index: usize) -> Result<(), DraftError> {
        self.require_drafting()?;
        if index >= self.blocks.len() {
            return Err(DraftError::block(index, "block", "no such draft block"));
        }
        if self.blocks.len() <= MIN_QUESTIONS {
            return Err(DraftError::config(
                "questionCount",
                "a draft needs at least one question",
            ));
        }
        self.blocks.remove(index);
        self.question_count = self.blocks.len();
        Ok(())
    }

    /// Replaces the current blocks with mock-generated stubs; the counts
    /// follow the generated shape and the editor moves straight to drafting.
    pub fn load_generated(&mut self, generated: Vec<GeneratedQuestion>) -> Result<(), DraftError> {
        if generated.is_empty() {
            return Err(DraftError::config(
                "questionCount",
                "no generated questions to load",
            ));
        }
        self.options_per_question = generated
            .first()
            .map(|g| g.options.len())
            .unwrap_or(DEFAULT_OPTIONS_PER_QUESTION);
        self.question_count = generated.len();
        self.blocks = generated
            .into_iter()
            .map(|g| DraftBlock {
                question_text: g.question_text,
                options: g.options,
                correct_answer: Some(g.correct_answer),
                marks: g.marks,
                time_limit_minutes: Some(g.time_limit_minutes),
            })
            .collect();
        self.phase = DraftPhase::Drafting;
        Ok(())
    }

    /// Validates every block, stopping at the first violation so nothing is
    /// partially committed. On success returns the repository inserts in
    /// block order; the editor state is untouched either way (the caller
    /// resets after the inserts land).
    pub fn validate(&self) -> Result<Vec<NewQuestion>, DraftError> {
        self.require_drafting()?;
        let mut inserts = Vec::with_capacity(self.blocks.len());
        for (index, block) in self.blocks.iter().enumerate() {
            if block.question_text.trim().is_empty() {
                return Err(DraftError::block(
                    index,
                    "questionText",
                    "question text must not be empty",
                ));
            }
            if block.options.iter().any(|opt| opt.trim().is_empty()) {
                return Err(DraftError::block(
                    index,
                    "options",
                    "all options must be filled in",
                ));
            }
            let Some(correct) = &block.correct_answer else {
                return Err(DraftError::block(
                    index,
                    "correctAnswer",
                    "select a correct answer",
                ));
            };
            if !block.options.iter().any(|opt| opt == correct) {
                return Err(DraftError::block(
                    index,
                    "correctAnswer",
                    "correct answer must be one of the provided options",
                ));
            }
            if block.marks < 1.0 || block.marks.fract() != 0.0 {
                return Err(DraftError::block(
                    index,
                    "marks",
                    "marks must be a positive whole number",
                ));
            }
            if let Some(limit) = block.time_limit_minutes {
                if limit < 1 {
                    return Err(DraftError::block(
                        index,
                        "timeLimitMinutes",
                        "time limit must be at least 1 minute",
                    ));
                }
            }

            inserts.push(NewQuestion {
                quiz_id: "unassigned".to_string(),
                question_text: block.question_text.clone(),
                options: block.options.clone(),
                correct_answer: correct.clone(),
                marks: block.marks,
                time_limit_minutes: block.time_limit_minutes.unwrap_or(1),
            });
        }
        Ok(inserts)
    }

    /// Back to the initial configuration phase, dropping all blocks.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn require_drafting(&self) -> Result<(), DraftError> {
        if self.phase != DraftPhase::Drafting {
            return Err(DraftError::config(
                "phase",
                "configure the draft before editing blocks",
            ));
        }
        Ok(())
    }

    fn block_mut(&mut self, index: usize) -> Result<&mut DraftBlock, DraftError> {
        self.require_drafting()?;
        self.blocks
            .get_mut(index)
            .ok_or_else(|| DraftError::block(index, "block", "no such draft block"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drafting_editor(questions: usize, options: usize) -> DraftEditor {
        let mut editor = DraftEditor::default();
        editor.configure(questions, options).expect("configure");
        editor
    }

    fn fill_block(editor: &mut DraftEditor, index: usize, text: &str, correct_slot: usize) {
        editor
            .set_question_text(index, text.to_string())
            .expect("text");
        let option_count = editor.blocks[index].options.len();
        for slot in 0..option_count {
            editor
                .set_option(index, slot, format!("{} option {}", text, slot + 1))
                .expect("option");
        }
        let answer = editor.blocks[index].options[correct_slot].clone();
        editor.select_correct(index, answer).expect("correct");
    }

    #[test]
    fn configure_rejects_out_of_bounds_counts() {
        let mut editor = DraftEditor::default();

        let err = editor.configure(0, 4).unwrap_err();
        assert_eq!(err.field, "questionCount");
        assert_eq!(editor.phase, DraftPhase::Configuring);

        let err = editor.configure(3, 7).unwrap_err();
        assert_eq!(err.field, "optionsPerQuestion");
        assert_eq!(editor.phase, DraftPhase::Configuring);

        editor.configure(3, 4).expect("valid configure");
        assert_eq!(editor.phase, DraftPhase::Drafting);
        assert_eq!(editor.blocks.len(), 3);
        assert!(editor.blocks.iter().all(|b| b.options.len() == 4));
    }

    #[test]
    fn reconcile_clears_correct_answer_lost_to_truncation() {
        let mut editor = drafting_editor(3, 4);
        // Block 0 keeps its answer in slot 1, block 1 loses its slot-3 answer,
        // block 2 loses its slot-4 answer.
        fill_block(&mut editor, 0, "Q1", 1);
        fill_block(&mut editor, 1, "Q2", 2);
        fill_block(&mut editor, 2, "Q3", 3);

        editor.resize(3, 2).expect("resize");

        assert!(editor.blocks.iter().all(|b| b.options.len() == 2));
        assert!(editor.blocks[0].correct_answer.is_some());
        assert_eq!(editor.blocks[1].correct_answer, None);
        assert_eq!(editor.blocks[2].correct_answer, None);
    }

    #[test]
    fn reconcile_grows_with_blanks_and_keeps_content() {
        let mut editor = drafting_editor(1, 2);
        fill_block(&mut editor, 0, "Kept", 0);

        editor.resize(3, 3).expect("resize");

        assert_eq!(editor.blocks.len(), 3);
        assert_eq!(editor.blocks[0].question_text, "Kept");
        assert_eq!(editor.blocks[0].options.len(), 3);
        assert_eq!(editor.blocks[0].options[2], "");
        // The kept answer still resolves, option growth must not clear it.
        assert_eq!(
            editor.blocks[0].correct_answer.as_deref(),
            Some("Kept option 1")
        );
        assert_eq!(editor.blocks[1], DraftBlock::blank(3));
    }

    #[test]
    fn editing_the_chosen_option_clears_the_selection() {
        let mut editor = drafting_editor(1, 2);
        fill_block(&mut editor, 0, "Q", 0);
        assert!(editor.blocks[0].correct_answer.is_some());

        editor
            .set_option(0, 0, "rewritten".to_string())
            .expect("set option");
        assert_eq!(editor.blocks[0].correct_answer, None);
    }

    #[test]
    fn select_correct_requires_an_existing_option() {
        let mut editor = drafting_editor(1, 2);
        let err = editor
            .select_correct(0, "not an option".to_string())
            .unwrap_err();
        assert_eq!(err.field, "correctAnswer");
        assert_eq!(err.block, Some(0));
    }

    #[test]
    fn delete_block_shrinks_question_count() {
        let mut editor = drafting_editor(3, 2);
        editor.delete_block(1).expect("delete");
        assert_eq!(editor.blocks.len(), 2);
        assert_eq!(editor.question_count, 2);

        editor.delete_block(0).expect("delete");
        let err = editor.delete_block(0).unwrap_err();
        assert_eq!(err.field, "questionCount");
        assert_eq!(editor.blocks.len(), 1);
    }

    #[test]
    fn validate_reports_first_violation_and_commits_nothing() {
        let mut editor = drafting_editor(2, 2);
        fill_block(&mut editor, 0, "Fine", 0);
        // Block 1 left blank: the failure points at it, not at block 0.
        let err = editor.validate().unwrap_err();
        assert_eq!(err.block, Some(1));
        assert_eq!(err.field, "questionText");
        // Draft untouched for correction.
        assert_eq!(editor.blocks.len(), 2);
        assert_eq!(editor.phase, DraftPhase::Drafting);
    }

    #[test]
    fn validate_rejects_fractional_or_non_positive_marks() {
        let mut editor = drafting_editor(1, 2);
        fill_block(&mut editor, 0, "Q", 0);

        editor.set_marks(0, 0.0).expect("set marks");
        assert_eq!(editor.validate().unwrap_err().field, "marks");

        editor.set_marks(0, 2.5).expect("set marks");
        assert_eq!(editor.validate().unwrap_err().field, "marks");

        editor.set_marks(0, 4.0).expect("set marks");
        let inserts = editor.validate().expect("valid");
        assert_eq!(inserts[0].marks, 4.0);
    }

    #[test]
    fn valid_draft_produces_inserts_with_correct_answer_among_options() {
        let mut editor = drafting_editor(2, 3);
        fill_block(&mut editor, 0, "Alpha", 2);
        fill_block(&mut editor, 1, "Beta", 0);
        editor.set_time_limit(1, Some(2)).expect("time limit");

        let inserts = editor.validate().expect("valid draft");
        assert_eq!(inserts.len(), 2);
        for insert in &inserts {
            assert!(insert.options.iter().any(|o| *o == insert.correct_answer));
        }
        assert_eq!(inserts[1].time_limit_minutes, 2);
        assert_eq!(inserts[0].time_limit_minutes, 1);
    }

    #[test]
    fn load_generated_moves_straight_to_drafting() {
        use crate::mock::generate_questions;

        let mut editor = DraftEditor::default();
        editor
            .load_generated(generate_questions("History", "Easy", 4, 3))
            .expect("load");

        assert_eq!(editor.phase, DraftPhase::Drafting);
        assert_eq!(editor.question_count, 4);
        assert_eq!(editor.options_per_question, 3);
        // Generated stubs validate as-is.
        assert_eq!(editor.validate().expect("valid").len(), 4);
    }

    #[test]
    fn draft_snapshot_roundtrips_through_json() {
        let mut editor = drafting_editor(2, 2);
        fill_block(&mut editor, 0, "Persisted", 1);

        let value = serde_json::to_value(&editor).expect("serialize");
        let restored: DraftEditor = serde_json::from_value(value).expect("deserialize");
        assert_eq!(restored.phase, DraftPhase::Drafting);
        assert_eq!(restored.blocks, editor.blocks);
    }
}
