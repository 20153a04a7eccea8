pub mod attempts;
pub mod core;
pub mod drafts;
pub mod leaderboard;
pub mod questions;
pub mod quizzes;
