//! Quiz file parser.
//!
//! Loads quizzes from TOML or JSON files and directories, and validates them.
//! Questions are first read as untyped values so a missing or unknown `kind`
//! is reported as [`QuizError::UnsupportedQuestionKind`] instead of a generic
//! deserialization error.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::error::QuizError;
use crate::evaluator::validate_question;
use crate::model::{KindTag, Question, QuestionKind, Quiz};

/// Intermediate structure shared by the TOML and JSON layouts.
#[derive(Debug, Deserialize)]
struct RawQuizFile {
    quiz: RawQuizHeader,
    #[serde(default)]
    questions: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawQuizHeader {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    task_type: String,
    #[serde(default)]
    minimum_pass_rate: Option<f64>,
    #[serde(default)]
    auto_advance_ms: Option<u64>,
}

/// Parse a single quiz file. `.json` files are read as JSON, anything else
/// as TOML.
pub fn parse_quiz(path: &Path) -> Result<Quiz> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read quiz file: {}", path.display()))?;

    parse_quiz_str(&content, path)
}

/// Parse quiz content, picking the format from `source_path`'s extension.
pub fn parse_quiz_str(content: &str, source_path: &Path) -> Result<Quiz> {
    let raw: RawQuizFile = if source_path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(content)
            .with_context(|| format!("failed to parse JSON: {}", source_path.display()))?
    } else {
        toml::from_str(content)
            .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?
    };

    let questions = raw
        .questions
        .into_iter()
        .enumerate()
        .map(|(position, value)| convert_question(position, value))
        .collect::<Result<Vec<_>, QuizError>>()
        .with_context(|| format!("invalid quiz: {}", source_path.display()))?;

    Ok(Quiz {
        id: raw.quiz.id,
        title: raw.quiz.title,
        description: raw.quiz.description,
        task_type: raw.quiz.task_type,
        minimum_pass_rate: raw.quiz.minimum_pass_rate,
        auto_advance_ms: raw.quiz.auto_advance_ms,
        questions,
    })
}

fn convert_question(position: usize, value: Value) -> Result<Question, QuizError> {
    let Some(id) = value.get("id").and_then(Value::as_str).map(str::to_string) else {
        return Err(QuizError::MissingField {
            question_id: format!("#{}", position + 1),
            field: "id".into(),
        });
    };

    match value.get("kind") {
        None => {
            return Err(QuizError::UnsupportedQuestionKind {
                question_id: id,
                kind: "<missing>".into(),
            })
        }
        Some(Value::String(kind)) if kind.parse::<KindTag>().is_ok() => {}
        Some(other) => {
            let kind = other.as_str().map(str::to_string).unwrap_or_else(|| other.to_string());
            return Err(QuizError::UnsupportedQuestionKind {
                question_id: id,
                kind,
            });
        }
    }

    let question: Question =
        serde_json::from_value(value).map_err(|e| QuizError::InvalidQuestion {
            question_id: id.clone(),
            reason: e.to_string(),
        })?;
    validate_question(&question)?;
    Ok(question)
}

/// Recursively load all `.toml` and `.json` quiz files from a directory.
pub fn load_quiz_directory(dir: &Path) -> Result<Vec<Quiz>> {
    let mut quizzes = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            quizzes.extend(load_quiz_directory(&path)?);
        } else if path
            .extension()
            .is_some_and(|ext| ext == "toml" || ext == "json")
        {
            match parse_quiz(&path) {
                Ok(quiz) => quizzes.push(quiz),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    quizzes.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(quizzes)
}

/// Load a single file, or every quiz under a directory.
pub fn load_quizzes(path: &Path) -> Result<Vec<Quiz>> {
    if path.is_dir() {
        load_quiz_directory(path)
    } else {
        Ok(vec![parse_quiz(path)?])
    }
}

/// A warning from quiz validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Check a quiz for issues that do not stop it from running.
pub fn validate_quiz(quiz: &Quiz) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if quiz.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "quiz has no questions and cannot be played".into(),
        });
    }

    if let Some(rate) = quiz.minimum_pass_rate {
        if !(0.0..=1.0).contains(&rate) {
            warnings.push(ValidationWarning {
                question_id: None,
                message: format!("minimum_pass_rate {rate} is outside 0.0..=1.0"),
            });
        } else if rate == 0.0 {
            warnings.push(ValidationWarning {
                question_id: None,
                message: "minimum_pass_rate is 0, every attempt passes".into(),
            });
        }
    }

    // Redemption bookkeeping is keyed by id
    let mut seen_ids = std::collections::HashSet::new();
    for question in &quiz.questions {
        if !seen_ids.insert(&question.id) {
            warnings.push(ValidationWarning {
                question_id: Some(question.id.clone()),
                message: format!("duplicate question ID: {}", question.id),
            });
        }
    }

    for question in &quiz.questions {
        let option_count = match &question.kind {
            QuestionKind::SingleChoice { options, .. }
            | QuestionKind::MultiSelect { options, .. }
            | QuestionKind::ImageChoice { options, .. }
            | QuestionKind::AudioChoice { options, .. } => Some(options.len()),
            QuestionKind::MatchPairs { .. } | QuestionKind::MultiBlank { .. } => None,
        };
        if option_count == Some(1) {
            warnings.push(ValidationWarning {
                question_id: Some(question.id.clone()),
                message: "only one option, the answer is given away".into(),
            });
        }
    }

    for question in &quiz.questions {
        if question.prompt().trim().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(question.id.clone()),
                message: "prompt is empty".into(),
            });
        }
    }

    for question in &quiz.questions {
        if question.explanation.is_none() {
            warnings.push(ValidationWarning {
                question_id: Some(question.id.clone()),
                message: "no explanation, learners get no feedback after answering".into(),
            });
        }
    }

    warnings
}
