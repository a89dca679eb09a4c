//! coursequiz-core: adaptive assessment engine for course quizzes.
//!
//! This crate defines the question model, per-kind answer evaluators, the
//! main/redemption round controller, the pass-rate policy, and the
//! completion payload handed back to the surrounding course player.

pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod parser;
pub mod policy;
pub mod report;
pub mod session;
pub mod store;
pub mod timer;
pub mod traits;

pub use config::EngineConfig;
pub use engine::{Action, Effect, EngineView, RoundController};
pub use error::QuizError;
pub use model::{Answer, AnswerRecord, KindTag, Phase, Question, QuestionKind, Quiz};
pub use report::CompletionPayload;
pub use session::QuizSession;
