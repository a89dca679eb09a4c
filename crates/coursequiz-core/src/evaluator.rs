//! Per-kind answer evaluators.
//!
//! Each question kind family has one stateless evaluator. Lookup goes
//! through [`evaluator_for`], an exhaustive match on [`KindTag`], so adding
//! a kind without an evaluator does not compile.

use std::collections::HashSet;

use crate::error::QuizError;
use crate::model::{Answer, KindTag, Question, QuestionKind};

/// Readiness, correctness, and content validation for one kind family.
pub trait Evaluator: Send + Sync {
    /// Whether every required part of `answer` is filled in.
    fn is_ready(&self, kind: &QuestionKind, answer: &Answer) -> bool;

    /// Whether a ready `answer` is correct. Never partial credit.
    fn is_correct(&self, kind: &QuestionKind, answer: &Answer) -> bool;

    /// Check that the question content can be evaluated at all.
    fn validate(&self, kind: &QuestionKind) -> Result<(), String>;
}

/// Single, image, and audio choice: one shared `answer_index`.
pub struct ChoiceEvaluator;

/// Multi-select: exact set equality.
pub struct MultiSelectEvaluator;

/// Match-pairs: a total left → right mapping.
pub struct MatchPairsEvaluator;

/// Multi-blank: one choice per blank, in order.
pub struct MultiBlankEvaluator;

static CHOICE: ChoiceEvaluator = ChoiceEvaluator;
static MULTI_SELECT: MultiSelectEvaluator = MultiSelectEvaluator;
static MATCH_PAIRS: MatchPairsEvaluator = MatchPairsEvaluator;
static MULTI_BLANK: MultiBlankEvaluator = MultiBlankEvaluator;

/// The evaluator registered for a kind tag.
pub fn evaluator_for(tag: KindTag) -> &'static dyn Evaluator {
    match tag {
        KindTag::SingleChoice | KindTag::ImageChoice | KindTag::AudioChoice => &CHOICE,
        KindTag::MultiSelect => &MULTI_SELECT,
        KindTag::MatchPairs => &MATCH_PAIRS,
        KindTag::MultiBlank => &MULTI_BLANK,
    }
}

pub fn is_answer_ready(question: &Question, answer: &Answer) -> bool {
    evaluator_for(question.tag()).is_ready(&question.kind, answer)
}

/// Correctness verdict. A not-ready answer is never correct.
pub fn is_correct(question: &Question, answer: &Answer) -> bool {
    let evaluator = evaluator_for(question.tag());
    evaluator.is_ready(&question.kind, answer) && evaluator.is_correct(&question.kind, answer)
}

/// Reject question content the engine cannot evaluate.
pub fn validate_question(question: &Question) -> Result<(), QuizError> {
    if question.id.trim().is_empty() {
        return Err(QuizError::MissingField {
            question_id: String::new(),
            field: "id".into(),
        });
    }
    evaluator_for(question.tag())
        .validate(&question.kind)
        .map_err(|reason| QuizError::InvalidQuestion {
            question_id: question.id.clone(),
            reason,
        })
}

fn choice_options(kind: &QuestionKind) -> Option<(&[String], usize)> {
    match kind {
        QuestionKind::SingleChoice {
            options,
            answer_index,
            ..
        }
        | QuestionKind::ImageChoice {
            options,
            answer_index,
            ..
        }
        | QuestionKind::AudioChoice {
            options,
            answer_index,
            ..
        } => Some((options, *answer_index)),
        _ => None,
    }
}

impl Evaluator for ChoiceEvaluator {
    fn is_ready(&self, kind: &QuestionKind, answer: &Answer) -> bool {
        match (choice_options(kind), answer) {
            (Some((options, _)), Answer::Choice(index)) => *index < options.len(),
            _ => false,
        }
    }

    fn is_correct(&self, kind: &QuestionKind, answer: &Answer) -> bool {
        match (choice_options(kind), answer) {
            (Some((_, expected)), Answer::Choice(index)) => *index == expected,
            _ => false,
        }
    }

    fn validate(&self, kind: &QuestionKind) -> Result<(), String> {
        let (options, answer_index) =
            choice_options(kind).ok_or_else(|| format!("{} is not a choice kind", kind.tag()))?;
        if options.is_empty() {
            return Err("options must not be empty".into());
        }
        if answer_index >= options.len() {
            return Err(format!(
                "answer_index {answer_index} out of range for {} options",
                options.len()
            ));
        }
        Ok(())
    }
}

impl Evaluator for MultiSelectEvaluator {
    fn is_ready(&self, kind: &QuestionKind, answer: &Answer) -> bool {
        match (kind, answer) {
            (QuestionKind::MultiSelect { options, .. }, Answer::Selection(selected)) => {
                !selected.is_empty() && selected.iter().all(|&i| i < options.len())
            }
            _ => false,
        }
    }

    fn is_correct(&self, kind: &QuestionKind, answer: &Answer) -> bool {
        match (kind, answer) {
            (QuestionKind::MultiSelect { answer_indices, .. }, Answer::Selection(selected)) => {
                selected == answer_indices
            }
            _ => false,
        }
    }

    fn validate(&self, kind: &QuestionKind) -> Result<(), String> {
        let QuestionKind::MultiSelect {
            options,
            answer_indices,
            ..
        } = kind
        else {
            return Err(format!("{} is not multi_select", kind.tag()));
        };
        if options.is_empty() {
            return Err("options must not be empty".into());
        }
        if answer_indices.is_empty() {
            return Err("answer_indices must not be empty".into());
        }
        if let Some(bad) = answer_indices.iter().find(|&&i| i >= options.len()) {
            return Err(format!(
                "answer index {bad} out of range for {} options",
                options.len()
            ));
        }
        Ok(())
    }
}

impl Evaluator for MatchPairsEvaluator {
    fn is_ready(&self, kind: &QuestionKind, answer: &Answer) -> bool {
        match (kind, answer) {
            (QuestionKind::MatchPairs { left, .. }, Answer::Pairs(pairs)) => {
                pairs.len() == left.len() && left.iter().all(|item| pairs.contains_key(&item.id))
            }
            _ => false,
        }
    }

    fn is_correct(&self, kind: &QuestionKind, answer: &Answer) -> bool {
        match (kind, answer) {
            (
                QuestionKind::MatchPairs {
                    left, answer_map, ..
                },
                Answer::Pairs(pairs),
            ) => left.iter().all(|item| {
                match (pairs.get(&item.id), answer_map.get(&item.id)) {
                    (Some(given), Some(expected)) => given == expected,
                    _ => false,
                }
            }),
            _ => false,
        }
    }

    fn validate(&self, kind: &QuestionKind) -> Result<(), String> {
        let QuestionKind::MatchPairs {
            left,
            right,
            answer_map,
            ..
        } = kind
        else {
            return Err(format!("{} is not match_pairs", kind.tag()));
        };
        if left.is_empty() {
            return Err("left items must not be empty".into());
        }

        let mut left_ids = HashSet::new();
        for item in left {
            if !left_ids.insert(item.id.as_str()) {
                return Err(format!("duplicate left item id '{}'", item.id));
            }
        }
        let right_ids: HashSet<&str> = right.iter().map(|item| item.id.as_str()).collect();

        for item in left {
            match answer_map.get(&item.id) {
                None => return Err(format!("answer_map has no entry for left item '{}'", item.id)),
                Some(target) if !right_ids.contains(target.as_str()) => {
                    return Err(format!(
                        "answer_map maps '{}' to unknown right item '{target}'",
                        item.id
                    ))
                }
                Some(_) => {}
            }
        }
        if let Some(extra) = answer_map.keys().find(|k| !left_ids.contains(k.as_str())) {
            return Err(format!("answer_map references unknown left item '{extra}'"));
        }
        Ok(())
    }
}

impl Evaluator for MultiBlankEvaluator {
    fn is_ready(&self, kind: &QuestionKind, answer: &Answer) -> bool {
        match (kind, answer) {
            (QuestionKind::MultiBlank { blanks, .. }, Answer::Blanks(choices)) => {
                choices.len() == blanks.len()
                    && blanks
                        .iter()
                        .zip(choices)
                        .all(|(blank, choice)| {
                            matches!(choice, Some(i) if *i < blank.options.len())
                        })
            }
            _ => false,
        }
    }

    fn is_correct(&self, kind: &QuestionKind, answer: &Answer) -> bool {
        match (kind, answer) {
            (QuestionKind::MultiBlank { blanks, .. }, Answer::Blanks(choices)) => {
                choices.len() == blanks.len()
                    && blanks
                        .iter()
                        .zip(choices)
                        .all(|(blank, choice)| *choice == Some(blank.answer_index))
            }
            _ => false,
        }
    }

    fn validate(&self, kind: &QuestionKind) -> Result<(), String> {
        let QuestionKind::MultiBlank { blanks, .. } = kind else {
            return Err(format!("{} is not multi_blank", kind.tag()));
        };
        if blanks.is_empty() {
            return Err("blanks must not be empty".into());
        }
        for (n, blank) in blanks.iter().enumerate() {
            if blank.options.is_empty() {
                return Err(format!("blank {n} has no options"));
            }
            if blank.answer_index >= blank.options.len() {
                return Err(format!(
                    "blank {n} answer_index {} out of range for {} options",
                    blank.answer_index,
                    blank.options.len()
                ));
            }
        }
        Ok(())
    }
}
