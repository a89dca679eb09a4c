//! Core data model types for coursequiz.
//!
//! Questions are authored content and never change once a round starts.
//! Answers are the learner's transient responses; answer records are the
//! append-only evidence of what was submitted.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;

/// A quiz task: ordered questions plus the host routing tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    /// Unique identifier for this quiz.
    pub id: String,
    /// Human-readable title.
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Passed through unchanged into the completion payload.
    pub task_type: String,
    /// Per-quiz threshold override.
    #[serde(default)]
    pub minimum_pass_rate: Option<f64>,
    /// Per-quiz auto-advance override in milliseconds.
    #[serde(default)]
    pub auto_advance_ms: Option<u64>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Quiz {
    /// `base` with this quiz's overrides applied.
    pub fn engine_config(&self, base: &EngineConfig) -> EngineConfig {
        EngineConfig {
            minimum_pass_rate: self.minimum_pass_rate.unwrap_or(base.minimum_pass_rate),
            auto_advance_ms: self.auto_advance_ms.unwrap_or(base.auto_advance_ms),
            tick_ms: base.tick_ms,
        }
    }
}

/// A single assessable item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Stable identifier, used for redemption bookkeeping.
    pub id: String,
    /// Kind-specific prompt data and the correct answer.
    #[serde(flatten)]
    pub kind: QuestionKind,
    /// Feedback shown after the learner submits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    pub fn tag(&self) -> KindTag {
        self.kind.tag()
    }

    /// The prompt text, whatever the kind.
    pub fn prompt(&self) -> &str {
        match &self.kind {
            QuestionKind::SingleChoice { prompt, .. }
            | QuestionKind::MultiSelect { prompt, .. }
            | QuestionKind::MatchPairs { prompt, .. }
            | QuestionKind::MultiBlank { prompt, .. }
            | QuestionKind::ImageChoice { prompt, .. }
            | QuestionKind::AudioChoice { prompt, .. } => prompt,
        }
    }
}

/// Kind-specific question content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice {
        prompt: String,
        options: Vec<String>,
        answer_index: usize,
    },
    MultiSelect {
        prompt: String,
        options: Vec<String>,
        answer_indices: BTreeSet<usize>,
    },
    MatchPairs {
        prompt: String,
        left: Vec<MatchItem>,
        right: Vec<MatchItem>,
        /// Left item id → right item id.
        answer_map: BTreeMap<String, String>,
    },
    MultiBlank {
        /// Template text; blanks are rendered by the host.
        prompt: String,
        blanks: Vec<Blank>,
    },
    ImageChoice {
        prompt: String,
        /// Image reference (path or URL) resolved by the host.
        image: String,
        options: Vec<String>,
        answer_index: usize,
    },
    AudioChoice {
        prompt: String,
        /// Audio reference (path or URL) resolved by the host.
        audio: String,
        options: Vec<String>,
        answer_index: usize,
    },
}

impl QuestionKind {
    pub fn tag(&self) -> KindTag {
        match self {
            QuestionKind::SingleChoice { .. } => KindTag::SingleChoice,
            QuestionKind::MultiSelect { .. } => KindTag::MultiSelect,
            QuestionKind::MatchPairs { .. } => KindTag::MatchPairs,
            QuestionKind::MultiBlank { .. } => KindTag::MultiBlank,
            QuestionKind::ImageChoice { .. } => KindTag::ImageChoice,
            QuestionKind::AudioChoice { .. } => KindTag::AudioChoice,
        }
    }

    /// The shared `answer_index` of the single-answer choice kinds.
    pub fn choice_answer_index(&self) -> Option<usize> {
        match self {
            QuestionKind::SingleChoice { answer_index, .. }
            | QuestionKind::ImageChoice { answer_index, .. }
            | QuestionKind::AudioChoice { answer_index, .. } => Some(*answer_index),
            _ => None,
        }
    }
}

/// One side of a match-pairs question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchItem {
    pub id: String,
    pub label: String,
}

/// One blank of a multi-blank question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blank {
    pub options: Vec<String>,
    pub answer_index: usize,
}

/// Fieldless kind tag, used for evaluator lookup and renderer dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindTag {
    SingleChoice,
    MultiSelect,
    MatchPairs,
    MultiBlank,
    ImageChoice,
    AudioChoice,
}

impl KindTag {
    pub const ALL: [KindTag; 6] = [
        KindTag::SingleChoice,
        KindTag::MultiSelect,
        KindTag::MatchPairs,
        KindTag::MultiBlank,
        KindTag::ImageChoice,
        KindTag::AudioChoice,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            KindTag::SingleChoice => "single_choice",
            KindTag::MultiSelect => "multi_select",
            KindTag::MatchPairs => "match_pairs",
            KindTag::MultiBlank => "multi_blank",
            KindTag::ImageChoice => "image_choice",
            KindTag::AudioChoice => "audio_choice",
        }
    }
}

impl fmt::Display for KindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KindTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KindTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| format!("unknown question kind: {s}"))
    }
}

/// The learner's response to the active question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Answer {
    /// Single, image, or audio choice.
    Choice(usize),
    /// Multi-select.
    Selection(BTreeSet<usize>),
    /// Match-pairs: left id → right id.
    Pairs(BTreeMap<String, String>),
    /// Multi-blank: one entry per blank, `None` while unfilled.
    Blanks(Vec<Option<usize>>),
}

impl Answer {
    /// The blank answer a UI starts from, or `None` for single-choice kinds
    /// where there is nothing to pre-fill.
    pub fn empty_for(kind: &QuestionKind) -> Option<Answer> {
        match kind {
            QuestionKind::MultiSelect { .. } => Some(Answer::Selection(BTreeSet::new())),
            QuestionKind::MatchPairs { .. } => Some(Answer::Pairs(BTreeMap::new())),
            QuestionKind::MultiBlank { blanks, .. } => {
                Some(Answer::Blanks(vec![None; blanks.len()]))
            }
            QuestionKind::SingleChoice { .. }
            | QuestionKind::ImageChoice { .. }
            | QuestionKind::AudioChoice { .. } => None,
        }
    }
}

/// Which round the engine is in. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Main,
    Redemption,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Main => write!(f, "main"),
            Phase::Redemption => write!(f, "redemption"),
            Phase::Done => write!(f, "done"),
        }
    }
}

/// One submission. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: String,
    /// Position of the question in the quiz's question list.
    pub question_index: usize,
    pub submitted_answer: Answer,
    pub is_correct: bool,
    pub phase: Phase,
    /// 1-based count of submissions for this question within the phase.
    pub attempt: u32,
    pub submitted_at: DateTime<Utc>,
}
