//! Pass-rate policy.
//!
//! Decides whether a learner has met the minimum-correct threshold and which
//! main-round questions must be replayed in the redemption round.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::AnswerRecord;

/// Absorbs binary floating-point noise such as `10 * 0.3 = 3.0000000000000004`.
const THRESHOLD_EPSILON: f64 = 1e-9;

/// Minimum-correct threshold over the main question count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassRatePolicy {
    pub minimum_pass_rate: f64,
}

impl Default for PassRatePolicy {
    fn default() -> Self {
        Self {
            minimum_pass_rate: 0.8,
        }
    }
}

impl PassRatePolicy {
    pub fn new(minimum_pass_rate: f64) -> Self {
        Self { minimum_pass_rate }
    }

    /// `ceil(total * rate)`: fractional passes are never allowed.
    pub fn required_correct(&self, total_questions: usize) -> usize {
        let exact = total_questions as f64 * self.minimum_pass_rate;
        let required = (exact - THRESHOLD_EPSILON).ceil().max(0.0) as usize;
        required.min(total_questions)
    }

    pub fn passed(&self, total_correct: usize, total_questions: usize) -> bool {
        total_correct >= self.required_correct(total_questions)
    }

    /// Tally main and redemption records against the threshold.
    pub fn summarize(
        &self,
        main_records: &[AnswerRecord],
        redemption_records: &[AnswerRecord],
        total_questions: usize,
    ) -> PassSummary {
        let main_correct = count_correct(main_records);
        let redemption_correct = count_correct(redemption_records);
        let total_correct = main_correct + redemption_correct;
        let required_correct = self.required_correct(total_questions);
        PassSummary {
            main_correct,
            redemption_correct,
            total_correct,
            total_questions,
            required_correct,
            passed: total_correct >= required_correct,
        }
    }
}

/// Correct-answer counts at one point in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSummary {
    pub main_correct: usize,
    pub redemption_correct: usize,
    pub total_correct: usize,
    pub total_questions: usize,
    pub required_correct: usize,
    pub passed: bool,
}

pub fn count_correct(records: &[AnswerRecord]) -> usize {
    records.iter().filter(|r| r.is_correct).count()
}

/// Question indices to replay: every incorrect main record, in original
/// order, each question id at most once.
pub fn redemption_queue(main_records: &[AnswerRecord]) -> Vec<usize> {
    let mut seen = HashSet::new();
    main_records
        .iter()
        .filter(|r| !r.is_correct)
        .filter(|r| seen.insert(r.question_id.as_str()))
        .map(|r| r.question_index)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::{Answer, Phase};

    fn record(id: &str, index: usize, correct: bool) -> AnswerRecord {
        AnswerRecord {
            question_id: id.into(),
            question_index: index,
            submitted_answer: Answer::Choice(0),
            is_correct: correct,
            phase: Phase::Main,
            attempt: 1,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn required_correct_rounds_up() {
        let policy = PassRatePolicy::default();
        assert_eq!(policy.required_correct(5), 4);
        assert_eq!(policy.required_correct(3), 3);
        assert_eq!(policy.required_correct(7), 6);
        assert_eq!(policy.required_correct(0), 0);
    }

    #[test]
    fn required_correct_ignores_float_noise() {
        assert_eq!(PassRatePolicy::new(0.3).required_correct(10), 3);
        assert_eq!(PassRatePolicy::new(0.7).required_correct(10), 7);
        assert_eq!(PassRatePolicy::new(1.0).required_correct(9), 9);
        assert_eq!(PassRatePolicy::new(0.0).required_correct(9), 0);
    }

    #[test]
    fn five_questions_boundary() {
        let policy = PassRatePolicy::default();
        assert!(policy.passed(4, 5));
        assert!(!policy.passed(3, 5));
    }

    #[test]
    fn summarize_counts_both_rounds() {
        let policy = PassRatePolicy::default();
        let main = vec![record("a", 0, true), record("b", 1, false), record("c", 2, true)];
        let redemption = vec![record("b", 1, true)];

        let before = policy.summarize(&main, &[], 3);
        assert_eq!(before.total_correct, 2);
        assert!(!before.passed);

        let after = policy.summarize(&main, &redemption, 3);
        assert_eq!(after.main_correct, 2);
        assert_eq!(after.redemption_correct, 1);
        assert_eq!(after.required_correct, 3);
        assert!(after.passed);
    }

    #[test]
    fn redemption_queue_preserves_order_and_dedups() {
        let records = vec![
            record("a", 0, false),
            record("b", 1, true),
            record("c", 2, false),
            record("a", 3, false),
        ];
        assert_eq!(redemption_queue(&records), vec![0, 2]);
    }
}
