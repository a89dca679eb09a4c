//! Round controller: the main/redemption state machine.
//!
//! The controller is a reducer. [`RoundController::apply`] takes an
//! [`Action`], mutates the engine state synchronously, and returns the
//! [`Effect`]s the owner must carry out (timers, completion reporting).
//! Nothing in here sleeps, spawns, or performs I/O.
//!
//! ## Phase transitions
//!
//! ```text
//! Main -> Done                  (threshold met by main records alone)
//! Main -> Redemption -> Done    (missed questions replayed until correct)
//! ```

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::QuizError;
use crate::evaluator::{is_answer_ready, is_correct, validate_question};
use crate::model::{Answer, AnswerRecord, Phase, Question};
use crate::policy::{redemption_queue, PassRatePolicy, PassSummary};
use crate::report::CompletionPayload;

/// An event from the host UI.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Replace the current answer wholesale.
    SetAnswer(Answer),
    /// Grade the current answer.
    Submit,
    /// Move on from a submitted question.
    Advance,
}

/// A side effect requested by a state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// An answer was submitted; start the auto-advance countdown.
    StartAutoAdvance { generation: u64 },
    /// The submitted state was left; any countdown is now stale.
    CancelAutoAdvance,
    /// The quiz finished. Emitted exactly once per controller.
    Completed(CompletionPayload),
}

/// Read-only snapshot for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineView<'a> {
    pub task_type: &'a str,
    pub phase: Phase,
    pub question: Option<&'a Question>,
    pub current_answer: Option<&'a Answer>,
    pub submitted: bool,
    /// Verdict of the current submission, once submitted.
    pub last_verdict: Option<bool>,
    /// 1-based position within the current round.
    pub position: usize,
    pub round_len: usize,
    pub main_answered: usize,
    pub main_total: usize,
    pub redemption_remaining: usize,
}

/// The adaptive assessment state machine for one quiz task.
#[derive(Debug, Clone)]
pub struct RoundController {
    questions: Arc<[Question]>,
    task_type: String,
    policy: PassRatePolicy,
    session_id: Uuid,
    phase: Phase,
    main_index: usize,
    redemption_index: usize,
    main_records: Vec<AnswerRecord>,
    /// Indices into `questions`, fixed at the main → redemption transition.
    redemption_queue: Vec<usize>,
    redemption_records: Vec<AnswerRecord>,
    /// Every record ever created, including discarded redemption attempts.
    history: Vec<AnswerRecord>,
    current_answer: Option<Answer>,
    submitted: bool,
    generation: u64,
    discarded_attempts: usize,
    completion: Option<CompletionPayload>,
}

impl RoundController {
    /// Validate the quiz content and start in the main round.
    pub fn new(
        questions: impl Into<Arc<[Question]>>,
        task_type: impl Into<String>,
        config: &EngineConfig,
    ) -> Result<Self, QuizError> {
        let questions = questions.into();
        config.validate()?;
        if questions.is_empty() {
            return Err(QuizError::EmptyQuestionList);
        }
        for question in questions.iter() {
            validate_question(question)?;
        }

        Ok(Self {
            questions,
            task_type: task_type.into(),
            policy: PassRatePolicy::new(config.minimum_pass_rate),
            session_id: Uuid::new_v4(),
            phase: Phase::Main,
            main_index: 0,
            redemption_index: 0,
            main_records: Vec::new(),
            redemption_queue: Vec::new(),
            redemption_records: Vec::new(),
            history: Vec::new(),
            current_answer: None,
            submitted: false,
            generation: 0,
            discarded_attempts: 0,
            completion: None,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn task_type(&self) -> &str {
        &self.task_type
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn main_index(&self) -> usize {
        self.main_index
    }

    pub fn redemption_index(&self) -> usize {
        self.redemption_index
    }

    pub fn main_records(&self) -> &[AnswerRecord] {
        &self.main_records
    }

    pub fn redemption_records(&self) -> &[AnswerRecord] {
        &self.redemption_records
    }

    pub fn history(&self) -> &[AnswerRecord] {
        &self.history
    }

    pub fn redemption_questions(&self) -> impl Iterator<Item = &Question> + '_ {
        self.redemption_queue.iter().map(|&i| &self.questions[i])
    }

    pub fn current_answer(&self) -> Option<&Answer> {
        self.current_answer.as_ref()
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Bumped on every submission and every advance.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn completion(&self) -> Option<&CompletionPayload> {
        self.completion.as_ref()
    }

    fn current_index(&self) -> Option<usize> {
        match self.phase {
            Phase::Main => Some(self.main_index),
            Phase::Redemption => self.redemption_queue.get(self.redemption_index).copied(),
            Phase::Done => None,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_index().map(|i| &self.questions[i])
    }

    /// Counts over the active tallies.
    pub fn summary(&self) -> PassSummary {
        self.policy.summarize(
            &self.main_records,
            &self.redemption_records,
            self.questions.len(),
        )
    }

    pub fn view(&self) -> EngineView<'_> {
        let last_verdict = if self.submitted {
            self.phase_records().last().map(|r| r.is_correct)
        } else {
            None
        };
        let (position, round_len) = match self.phase {
            Phase::Main => (self.main_index + 1, self.questions.len()),
            Phase::Redemption => (self.redemption_index + 1, self.redemption_queue.len()),
            Phase::Done => (0, 0),
        };
        let redemption_remaining = match self.phase {
            Phase::Redemption => self.redemption_queue.len() - self.redemption_index,
            Phase::Main | Phase::Done => 0,
        };

        EngineView {
            task_type: &self.task_type,
            phase: self.phase,
            question: self.current_question(),
            current_answer: self.current_answer.as_ref(),
            submitted: self.submitted,
            last_verdict,
            position,
            round_len,
            main_answered: self.main_records.len(),
            main_total: self.questions.len(),
            redemption_remaining,
        }
    }

    fn phase_records(&self) -> &[AnswerRecord] {
        match self.phase {
            Phase::Main => &self.main_records,
            Phase::Redemption => &self.redemption_records,
            Phase::Done => &[],
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn set_answer(&mut self, answer: Answer) -> Vec<Effect> {
        self.apply(Action::SetAnswer(answer))
    }

    pub fn submit_answer(&mut self) -> Vec<Effect> {
        self.apply(Action::Submit)
    }

    pub fn advance(&mut self) -> Vec<Effect> {
        self.apply(Action::Advance)
    }

    /// Apply one action. Usage errors are ignored and produce no effects.
    pub fn apply(&mut self, action: Action) -> Vec<Effect> {
        if self.phase == Phase::Done {
            tracing::debug!(?action, "quiz already done, ignoring");
            return Vec::new();
        }

        match action {
            Action::SetAnswer(answer) => {
                if self.submitted {
                    tracing::debug!("answer already submitted, ignoring edit");
                } else {
                    self.current_answer = Some(answer);
                }
                Vec::new()
            }
            Action::Submit => self.submit(),
            Action::Advance => self.advance_from_submitted(),
        }
    }

    fn submit(&mut self) -> Vec<Effect> {
        if self.submitted {
            tracing::debug!("answer already submitted, ignoring");
            return Vec::new();
        }
        let Some(index) = self.current_index() else {
            return Vec::new();
        };
        let question = &self.questions[index];
        let Some(answer) = self.current_answer.clone() else {
            tracing::debug!(question = %question.id, "no answer to submit");
            return Vec::new();
        };
        if !is_answer_ready(question, &answer) {
            tracing::debug!(question = %question.id, "answer not ready, ignoring submit");
            return Vec::new();
        }

        let verdict = is_correct(question, &answer);
        let attempt = self
            .history
            .iter()
            .filter(|r| r.question_index == index && r.phase == self.phase)
            .count() as u32
            + 1;
        let record = AnswerRecord {
            question_id: question.id.clone(),
            question_index: index,
            submitted_answer: answer,
            is_correct: verdict,
            phase: self.phase,
            attempt,
            submitted_at: Utc::now(),
        };
        tracing::debug!(
            question = %record.question_id,
            phase = %self.phase,
            attempt,
            correct = verdict,
            "answer submitted"
        );

        self.history.push(record.clone());
        match self.phase {
            Phase::Main => self.main_records.push(record),
            Phase::Redemption => self.redemption_records.push(record),
            Phase::Done => unreachable!("submit is rejected once done"),
        }
        self.submitted = true;
        self.generation += 1;

        vec![Effect::StartAutoAdvance {
            generation: self.generation,
        }]
    }

    fn advance_from_submitted(&mut self) -> Vec<Effect> {
        if !self.submitted {
            tracing::debug!("nothing submitted yet, ignoring advance");
            return Vec::new();
        }

        let mut effects = vec![Effect::CancelAutoAdvance];
        match self.phase {
            Phase::Main => {
                if self.main_index + 1 < self.questions.len() {
                    self.main_index += 1;
                } else {
                    self.finish_main_round(&mut effects);
                }
            }
            Phase::Redemption => {
                let last_correct = self.redemption_records.last().is_some_and(|r| r.is_correct);
                if !last_correct {
                    // Retry the identical item; the miss leaves the tally.
                    self.redemption_records.pop();
                    self.discarded_attempts += 1;
                } else if self.redemption_index + 1 < self.redemption_queue.len() {
                    self.redemption_index += 1;
                } else {
                    self.finish(&mut effects);
                }
            }
            Phase::Done => unreachable!("advance is rejected once done"),
        }

        self.current_answer = None;
        self.submitted = false;
        self.generation += 1;
        effects
    }

    fn finish_main_round(&mut self, effects: &mut Vec<Effect>) {
        let summary = self
            .policy
            .summarize(&self.main_records, &[], self.questions.len());
        if summary.passed {
            tracing::info!(
                correct = summary.main_correct,
                required = summary.required_correct,
                "main round passed"
            );
            self.finish(effects);
            return;
        }

        self.redemption_queue = redemption_queue(&self.main_records);
        if self.redemption_queue.is_empty() {
            self.finish(effects);
            return;
        }
        tracing::info!(
            correct = summary.main_correct,
            required = summary.required_correct,
            missed = self.redemption_queue.len(),
            "entering redemption round"
        );
        self.phase = Phase::Redemption;
        self.redemption_index = 0;
    }

    fn finish(&mut self, effects: &mut Vec<Effect>) {
        self.phase = Phase::Done;
        if self.completion.is_some() {
            return;
        }

        let payload = CompletionPayload::new(
            self.session_id,
            &self.task_type,
            &self.summary(),
            self.discarded_attempts,
        );
        tracing::info!(
            task_type = %payload.task_type,
            passed = payload.passed,
            total_correct = payload.total_correct,
            total_questions = payload.total_questions,
            "quiz complete"
        );
        self.completion = Some(payload.clone());
        effects.push(Effect::Completed(payload));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::model::{MatchItem, QuestionKind};

    const RIGHT: Answer = Answer::Choice(0);
    const WRONG: Answer = Answer::Choice(1);

    fn choice(id: &str) -> Question {
        Question {
            id: id.into(),
            kind: QuestionKind::SingleChoice {
                prompt: format!("prompt {id}"),
                options: vec!["right".into(), "wrong".into()],
                answer_index: 0,
            },
            explanation: None,
        }
    }

    fn quiz(n: usize) -> RoundController {
        let questions: Vec<Question> = (0..n).map(|i| choice(&format!("q{i}"))).collect();
        RoundController::new(questions, "vocabulary_quiz", &EngineConfig::default()).unwrap()
    }

    fn answer(engine: &mut RoundController, answer: Answer) -> Vec<Effect> {
        engine.set_answer(answer);
        let mut effects = engine.submit_answer();
        effects.extend(engine.advance());
        effects
    }

    fn completion(effects: &[Effect]) -> Option<&CompletionPayload> {
        effects.iter().find_map(|e| match e {
            Effect::Completed(p) => Some(p),
            _ => None,
        })
    }

    #[test]
    fn rejects_bad_configuration() {
        assert_eq!(
            RoundController::new(Vec::<Question>::new(), "t", &EngineConfig::default())
                .unwrap_err(),
            QuizError::EmptyQuestionList
        );

        let config = EngineConfig {
            minimum_pass_rate: 1.2,
            ..Default::default()
        };
        assert!(matches!(
            RoundController::new(vec![choice("a")], "t", &config),
            Err(QuizError::InvalidPassRate(_))
        ));
    }

    #[test]
    fn four_of_five_passes_without_redemption() {
        let mut engine = quiz(5);
        for a in [RIGHT, RIGHT, WRONG, RIGHT, RIGHT] {
            answer(&mut engine, a);
        }
        assert_eq!(engine.phase(), Phase::Done);
        assert_eq!(engine.redemption_questions().count(), 0);
        let payload = engine.completion().unwrap();
        assert!(payload.passed);
        assert_eq!(payload.total_correct, 4);
        assert_eq!(payload.required_correct, 4);
    }

    #[test]
    fn three_of_five_triggers_redemption_on_missed() {
        let mut engine = quiz(5);
        for a in [WRONG, RIGHT, RIGHT, WRONG, RIGHT] {
            answer(&mut engine, a);
        }
        assert_eq!(engine.phase(), Phase::Redemption);
        let ids: Vec<&str> = engine.redemption_questions().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["q0", "q3"]);
        assert_eq!(engine.current_question().unwrap().id, "q0");
    }

    #[test]
    fn three_question_scenario() {
        let mut engine = quiz(3);
        answer(&mut engine, RIGHT);
        answer(&mut engine, WRONG);
        answer(&mut engine, RIGHT);
        assert_eq!(engine.phase(), Phase::Redemption);
        assert_eq!(engine.redemption_questions().count(), 1);

        let effects = answer(&mut engine, RIGHT);
        let payload = completion(&effects).expect("completion emitted");
        assert!(payload.passed);
        assert_eq!(payload.total_correct, 3);
        assert_eq!(payload.total_questions, 3);
        assert_eq!(payload.main_correct, 2);
        assert_eq!(payload.redemption_correct, 1);
        assert_eq!(payload.pass_rate, 1.0);
    }

    #[test]
    fn redemption_retries_until_correct() {
        let mut engine = quiz(2);
        answer(&mut engine, WRONG);
        answer(&mut engine, RIGHT);
        assert_eq!(engine.phase(), Phase::Redemption);

        let mut presentations = 0;
        for a in [WRONG, WRONG, RIGHT] {
            assert_eq!(engine.current_question().unwrap().id, "q0");
            presentations += 1;
            answer(&mut engine, a);
        }

        assert_eq!(presentations, 3);
        assert_eq!(engine.phase(), Phase::Done);
        assert_eq!(engine.redemption_records().len(), 1);
        assert!(engine.redemption_records()[0].is_correct);
        assert_eq!(engine.redemption_records()[0].attempt, 3);
        assert_eq!(engine.history().len(), 5);
        assert_eq!(engine.completion().unwrap().discarded_attempts, 2);
    }

    #[test]
    fn first_try_correct_never_redeemed() {
        let mut engine = quiz(4);
        for a in [RIGHT, WRONG, WRONG, RIGHT] {
            answer(&mut engine, a);
        }
        let ids: Vec<&str> = engine.redemption_questions().map(|q| q.id.as_str()).collect();
        assert!(!ids.contains(&"q0"));
        assert!(!ids.contains(&"q3"));
    }

    #[test]
    fn advance_when_done_is_idempotent() {
        let mut engine = quiz(1);
        let effects = answer(&mut engine, RIGHT);
        assert!(completion(&effects).is_some());

        let before = engine.view().phase;
        let history = engine.history().len();
        for _ in 0..3 {
            assert!(engine.advance().is_empty());
            assert!(engine.submit_answer().is_empty());
        }
        assert_eq!(engine.phase(), before);
        assert_eq!(engine.history().len(), history);
    }

    #[test]
    fn edits_and_resubmits_ignored_after_submit() {
        let mut engine = quiz(2);
        engine.set_answer(WRONG);
        let effects = engine.submit_answer();
        assert_eq!(effects, vec![Effect::StartAutoAdvance { generation: 1 }]);

        engine.set_answer(RIGHT);
        assert!(engine.submit_answer().is_empty());
        assert_eq!(engine.current_answer(), Some(&WRONG));
        assert_eq!(engine.main_records().len(), 1);
        assert_eq!(engine.view().last_verdict, Some(false));
    }

    #[test]
    fn advance_clears_answer_state() {
        let mut engine = quiz(2);
        engine.set_answer(RIGHT);
        engine.submit_answer();
        let effects = engine.advance();
        assert_eq!(effects, vec![Effect::CancelAutoAdvance]);
        assert!(engine.current_answer().is_none());
        assert!(!engine.is_submitted());
        assert_eq!(engine.main_index(), 1);
        assert_eq!(engine.generation(), 2);
    }

    #[test]
    fn advance_before_submit_is_noop() {
        let mut engine = quiz(2);
        engine.set_answer(RIGHT);
        assert!(engine.advance().is_empty());
        assert_eq!(engine.main_index(), 0);
        assert_eq!(engine.current_answer(), Some(&RIGHT));
    }

    #[test]
    fn partial_match_pairs_submit_rejected() {
        let item = |id: &str| MatchItem {
            id: id.into(),
            label: id.into(),
        };
        let question = Question {
            id: "pairs".into(),
            kind: QuestionKind::MatchPairs {
                prompt: "Match".into(),
                left: vec![item("a"), item("b"), item("c")],
                right: vec![item("1"), item("2"), item("3")],
                answer_map: BTreeMap::from([
                    ("a".to_string(), "1".to_string()),
                    ("b".to_string(), "2".to_string()),
                    ("c".to_string(), "3".to_string()),
                ]),
            },
            explanation: None,
        };
        let mut engine =
            RoundController::new(vec![question], "matching", &EngineConfig::default()).unwrap();

        let mut pairs = BTreeMap::from([
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ]);
        engine.set_answer(Answer::Pairs(pairs.clone()));
        assert!(engine.submit_answer().is_empty());
        assert!(engine.main_records().is_empty());
        assert!(!engine.is_submitted());

        pairs.insert("c".to_string(), "3".to_string());
        engine.set_answer(Answer::Pairs(pairs));
        assert_eq!(engine.submit_answer().len(), 1);
        assert_eq!(engine.main_records().len(), 1);
        assert!(engine.main_records()[0].is_correct);
    }

    #[test]
    fn duplicate_ids_redeemed_once() {
        let questions = vec![choice("dup"), choice("dup"), choice("other")];
        let mut engine =
            RoundController::new(questions, "t", &EngineConfig::default()).unwrap();
        for a in [WRONG, WRONG, RIGHT] {
            answer(&mut engine, a);
        }
        assert_eq!(engine.phase(), Phase::Redemption);
        assert_eq!(engine.redemption_questions().count(), 1);

        // One redemption credit is not enough for 3 questions at 0.8, but
        // the round still ends once every queued item is answered.
        let effects = answer(&mut engine, RIGHT);
        let payload = completion(&effects).unwrap();
        assert_eq!(payload.total_correct, 2);
        assert!(!payload.passed);
    }

    #[test]
    fn record_counts_stay_bounded_for_every_main_pattern() {
        let n = 5;
        for pattern in 0u32..(1 << n) {
            let mut engine = quiz(n);
            for i in 0..n {
                let a = if pattern & (1 << i) != 0 { RIGHT } else { WRONG };
                answer(&mut engine, a);
                assert!(engine.main_records().len() <= n);
            }

            // Alternate misses and hits through redemption.
            let mut step = 0;
            let mut completions = 0;
            while engine.phase() == Phase::Redemption {
                let a = if step % 2 == 0 { WRONG } else { RIGHT };
                let effects = answer(&mut engine, a);
                completions += effects
                    .iter()
                    .filter(|e| matches!(e, Effect::Completed(_)))
                    .count();
                assert!(engine.redemption_records().len() <= engine.redemption_questions().count());
                step += 1;
            }

            assert_eq!(engine.phase(), Phase::Done);
            assert!(engine.completion().unwrap().passed, "pattern {pattern:05b}");
            assert!(completions <= 1);
            assert!(engine.advance().is_empty());
        }
    }

    #[test]
    fn view_tracks_progress() {
        let mut engine = quiz(3);
        let view = engine.view();
        assert_eq!(view.position, 1);
        assert_eq!(view.round_len, 3);
        assert_eq!(view.question.unwrap().id, "q0");
        assert_eq!(view.task_type, "vocabulary_quiz");

        answer(&mut engine, WRONG);
        answer(&mut engine, WRONG);
        answer(&mut engine, RIGHT);
        let view = engine.view();
        assert_eq!(view.phase, Phase::Redemption);
        assert_eq!(view.main_answered, 3);
        assert_eq!(view.round_len, 2);
        assert_eq!(view.redemption_remaining, 2);
    }
}
