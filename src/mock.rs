use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// An editable question stub produced by the mock generator. Stubs have no
/// id and belong to no quiz until the teacher commits them through the
/// draft editor; marks and time limit default to 1 pending manual edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub marks: f64,
    pub time_limit_minutes: u32,
}

struct Template {
    question_text: String,
    correct: String,
    bank: Vec<String>,
}

fn template_for(topic: &str, difficulty: &str, index: usize) -> Template {
    match difficulty {
        "Easy" => Template {
            question_text: format!("What is the capital of {}?", topic),
            correct: "Paris".to_string(),
            bank: ["Paris", "London", "Berlin", "Rome", "Madrid", "Tokyo"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        },
        "Medium" => Template {
            question_text: format!(
                "In {}, which concept describes the interaction between supply and demand?",
                topic
            ),
            correct: "Equilibrium".to_string(),
            bank: [
                "Equilibrium",
                "Elasticity",
                "Utility",
                "Scarcity",
                "Inflation",
                "Deflation",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        },
        "Hard" => Template {
            question_text: format!(
                "Explain the implications of Heisenberg's Uncertainty Principle in the context of {}.",
                topic
            ),
            correct: "It states that one cannot simultaneously know the exact position and momentum of a particle.".to_string(),
            bank: [
                "It states that one cannot simultaneously know the exact position and momentum of a particle.",
                "It describes the behavior of particles at relativistic speeds.",
                "It quantifies the energy levels of electrons in an atom.",
                "It relates to the wave-particle duality of light.",
                "It is a fundamental principle of classical mechanics.",
                "It applies only to macroscopic objects.",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        },
        other => Template {
            question_text: format!(
                "[{}] According to \"{}\", what is the key concept related to topic {}?",
                other,
                topic,
                index + 1
            ),
            correct: format!("Option A for {}", index + 1),
            bank: ["A", "B", "C", "D", "E", "F"]
                .iter()
                .map(|letter| format!("Option {} for {}", letter, index + 1))
                .collect(),
        },
    }
}

/// Synthesizes `count` question stubs for a topic/difficulty pair. Total:
/// always returns exactly `count` entries with exactly `options_per_question`
/// options each, the correct answer among them. Distractors are drawn from a
/// fixed per-difficulty bank, shuffled, and padded with generic placeholders
/// when the bank runs short.
pub fn generate_questions(
    topic: &str,
    difficulty: &str,
    count: usize,
    options_per_question: usize,
) -> Vec<GeneratedQuestion> {
    let mut rng = rand::thread_rng();
    let mut generated = Vec::with_capacity(count);

    for index in 0..count {
        let template = template_for(topic, difficulty, index);

        let mut distractors: Vec<String> = template
            .bank
            .iter()
            .filter(|opt| **opt != template.correct)
            .cloned()
            .collect();
        distractors.shuffle(&mut rng);
        distractors.truncate(options_per_question.saturating_sub(1));

        let mut options = Vec::with_capacity(options_per_question);
        options.push(template.correct.clone());
        options.append(&mut distractors);
        while options.len() < options_per_question {
            options.push(format!("Generic Option {}", options.len() + 1));
        }
        options.truncate(options_per_question);
        options.shuffle(&mut rng);

        // With zero option slots there is nothing the correct answer could
        // point at; keep the template answer rather than panicking.
        let mut correct = template.correct;
        if let Some(first) = options.first() {
            if !options.iter().any(|opt| *opt == correct) {
                correct = first.clone();
            }
        }

        generated.push(GeneratedQuestion {
            question_text: template.question_text,
            options,
            correct_answer: correct,
            marks: 1.0,
            time_limit_minutes: 1,
        });
    }

    generated
}
