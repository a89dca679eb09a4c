//! Configuration error types.
//!
//! These errors describe quiz content the engine refuses to run. They are
//! fatal: the engine never guesses a verdict for a question it cannot
//! evaluate, since that would corrupt the pass-rate computation.

use thiserror::Error;

/// Errors raised while loading or constructing a quiz.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QuizError {
    /// The question's `kind` tag is missing or has no evaluator.
    #[error("unsupported question kind '{kind}' for question '{question_id}'")]
    UnsupportedQuestionKind { question_id: String, kind: String },

    /// A required field is absent.
    #[error("question '{question_id}' is missing required field '{field}'")]
    MissingField { question_id: String, field: String },

    /// The question is structurally present but its content is inconsistent.
    #[error("invalid question '{question_id}': {reason}")]
    InvalidQuestion { question_id: String, reason: String },

    /// A quiz must contain at least one question.
    #[error("quiz has no questions")]
    EmptyQuestionList,

    /// The minimum pass rate must be a finite value in `0.0..=1.0`.
    #[error("minimum pass rate must be between 0.0 and 1.0, got {0}")]
    InvalidPassRate(f64),

    /// Auto-advance spawns its countdown on the ambient tokio runtime.
    #[error("auto-advance requires a tokio runtime, none is running")]
    RuntimeUnavailable,
}

impl QuizError {
    /// The id of the offending question, if the error concerns one.
    pub fn question_id(&self) -> Option<&str> {
        match self {
            QuizError::UnsupportedQuestionKind { question_id, .. }
            | QuizError::MissingField { question_id, .. }
            | QuizError::InvalidQuestion { question_id, .. } => Some(question_id),
            QuizError::EmptyQuestionList
            | QuizError::InvalidPassRate(_)
            | QuizError::RuntimeUnavailable => None,
        }
    }
}
