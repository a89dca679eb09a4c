//! Session driver: runs a round controller's effects.
//!
//! `QuizSession` is what a host embeds. It forwards UI actions to the
//! [`RoundController`], starts and cancels the auto-advance countdown the
//! controller asks for, and hands the completion payload to the host's
//! callback exactly once.

use std::sync::Arc;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::engine::{Action, Effect, EngineView, RoundController};
use crate::error::QuizError;
use crate::model::{Answer, Question};
use crate::report::CompletionPayload;
use crate::timer::{AutoAdvanceTimer, TimerEvent};

/// Host callback receiving the completion payload.
pub type CompletionCallback = Box<dyn FnOnce(&CompletionPayload) + Send>;

/// A running quiz task.
pub struct QuizSession {
    controller: RoundController,
    timer: Option<AutoAdvanceTimer>,
    on_complete: Option<CompletionCallback>,
    remaining: Option<Duration>,
}

impl QuizSession {
    /// Create a session. With auto-advance enabled this must be called from
    /// within a tokio runtime, since the countdown is spawned onto it.
    pub fn new(
        questions: impl Into<Arc<[Question]>>,
        task_type: impl Into<String>,
        config: &EngineConfig,
    ) -> Result<Self, QuizError> {
        let controller = RoundController::new(questions, task_type, config)?;
        if config.auto_advance().is_some() && tokio::runtime::Handle::try_current().is_err() {
            return Err(QuizError::RuntimeUnavailable);
        }
        let timer = config
            .auto_advance()
            .map(|duration| AutoAdvanceTimer::new(duration, config.tick()));
        Ok(Self {
            controller,
            timer,
            on_complete: None,
            remaining: None,
        })
    }

    /// Register the callback that receives the completion payload.
    pub fn on_complete(
        mut self,
        callback: impl FnOnce(&CompletionPayload) + Send + 'static,
    ) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn controller(&self) -> &RoundController {
        &self.controller
    }

    pub fn view(&self) -> EngineView<'_> {
        self.controller.view()
    }

    pub fn completion(&self) -> Option<&CompletionPayload> {
        self.controller.completion()
    }

    pub fn is_done(&self) -> bool {
        self.controller.completion().is_some()
    }

    pub fn auto_advance_enabled(&self) -> bool {
        self.timer.is_some()
    }

    /// Time left before the current submission advances on its own.
    pub fn auto_advance_remaining(&self) -> Option<Duration> {
        self.remaining
    }

    pub fn set_answer(&mut self, answer: Answer) {
        self.dispatch(Action::SetAnswer(answer));
    }

    pub fn submit(&mut self) {
        self.dispatch(Action::Submit);
    }

    /// Manual "next". Cancels the countdown before the transition so the
    /// timer can never advance the same submission a second time.
    pub fn advance(&mut self) {
        self.cancel_timer();
        self.dispatch(Action::Advance);
    }

    /// Wait for the next countdown event. Never resolves when auto-advance
    /// is disabled, which makes it safe to use in a `select!` loop.
    pub async fn next_timer_event(&mut self) -> TimerEvent {
        match self.timer.as_mut() {
            Some(timer) => match timer.recv().await {
                Some(event) => event,
                None => std::future::pending().await,
            },
            None => std::future::pending().await,
        }
    }

    /// Apply a countdown event. Returns `true` if it advanced the quiz.
    pub fn handle_timer_event(&mut self, event: TimerEvent) -> bool {
        let current = self.controller.generation();
        if event.generation() != current {
            tracing::debug!(
                event_generation = event.generation(),
                current,
                "discarding stale timer event"
            );
            return false;
        }

        match event {
            TimerEvent::Tick { remaining, .. } => {
                self.remaining = Some(remaining);
                false
            }
            TimerEvent::Fired { .. } => {
                self.remaining = None;
                self.dispatch(Action::Advance);
                true
            }
        }
    }

    /// Apply every already-queued countdown event without waiting.
    /// Returns how many of them advanced the quiz.
    pub fn pump_timer(&mut self) -> usize {
        let mut advanced = 0;
        while let Some(event) = self.timer.as_mut().and_then(|t| t.try_recv()) {
            if self.handle_timer_event(event) {
                advanced += 1;
            }
        }
        advanced
    }

    fn dispatch(&mut self, action: Action) {
        let effects = self.controller.apply(action);
        for effect in effects {
            match effect {
                Effect::StartAutoAdvance { generation } => {
                    if let Some(timer) = self.timer.as_mut() {
                        self.remaining = Some(timer.duration());
                        timer.start(generation);
                    }
                }
                Effect::CancelAutoAdvance => self.cancel_timer(),
                Effect::Completed(payload) => {
                    if let Some(callback) = self.on_complete.take() {
                        callback(&payload);
                    }
                }
            }
        }
    }

    fn cancel_timer(&mut self) {
        self.remaining = None;
        if let Some(timer) = self.timer.as_mut() {
            timer.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use tokio::time;

    use super::*;
    use crate::model::{Phase, QuestionKind};

    fn choice(id: &str) -> Question {
        Question {
            id: id.into(),
            kind: QuestionKind::SingleChoice {
                prompt: id.into(),
                options: vec!["right".into(), "wrong".into()],
                answer_index: 0,
            },
            explanation: None,
        }
    }

    fn questions(n: usize) -> Vec<Question> {
        (0..n).map(|i| choice(&format!("q{i}"))).collect()
    }

    fn auto(ms: u64) -> EngineConfig {
        EngineConfig {
            auto_advance_ms: ms,
            tick_ms: 100,
            ..Default::default()
        }
    }

    #[test]
    fn auto_advance_outside_runtime_is_rejected() {
        let err = QuizSession::new(questions(2), "listening", &auto(500)).err();
        assert_eq!(err, Some(QuizError::RuntimeUnavailable));

        // Without a countdown there is nothing to spawn.
        assert!(QuizSession::new(questions(2), "listening", &auto(0)).is_ok());
    }

    #[test]
    fn completion_callback_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(None));
        let mut session = QuizSession::new(questions(3), "listening", &EngineConfig::default())
            .unwrap()
            .on_complete({
                let calls = Arc::clone(&calls);
                let seen = Arc::clone(&seen);
                move |payload| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    *seen.lock().unwrap() = Some(payload.clone());
                }
            });

        for a in [0, 1, 0, 0] {
            session.set_answer(Answer::Choice(a));
            session.submit();
            session.advance();
        }
        for _ in 0..3 {
            session.advance();
        }

        assert!(session.is_done());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let payload = seen.lock().unwrap().clone().unwrap();
        assert_eq!(payload.task_type, "listening");
        assert!(payload.passed);
        assert_eq!(payload.total_correct, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_advances_after_submit() {
        let mut session = QuizSession::new(questions(2), "t", &auto(1000)).unwrap();
        session.set_answer(Answer::Choice(0));
        session.submit();
        assert_eq!(session.auto_advance_remaining(), Some(Duration::from_millis(1000)));

        let mut ticks = 0;
        loop {
            let event = session.next_timer_event().await;
            if session.handle_timer_event(event) {
                break;
            }
            ticks += 1;
        }

        assert_eq!(ticks, 9);
        assert_eq!(session.controller().main_index(), 1);
        assert!(!session.controller().is_submitted());
        assert!(session.auto_advance_remaining().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn question_change_cancels_timer() {
        let mut session = QuizSession::new(questions(3), "t", &auto(1000)).unwrap();
        session.set_answer(Answer::Choice(0));
        session.submit();
        time::sleep(Duration::from_millis(400)).await;

        session.advance();
        assert_eq!(session.controller().main_index(), 1);

        time::sleep(Duration::from_secs(3)).await;
        assert_eq!(session.pump_timer(), 0);
        assert_eq!(session.controller().main_index(), 1);
        assert!(!session.controller().is_submitted());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_events_are_discarded() {
        let mut session = QuizSession::new(questions(3), "t", &auto(500)).unwrap();
        session.set_answer(Answer::Choice(0));
        session.submit();
        let stale = TimerEvent::Fired {
            generation: session.controller().generation(),
        };
        session.advance();

        assert!(!session.handle_timer_event(stale));
        assert_eq!(session.controller().main_index(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_drives_whole_quiz_to_completion() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut session = QuizSession::new(questions(2), "t", &auto(200))
            .unwrap()
            .on_complete({
                let calls = Arc::clone(&calls);
                move |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                }
            });

        while !session.is_done() {
            session.set_answer(Answer::Choice(0));
            session.submit();
            loop {
                let event = session.next_timer_event().await;
                if session.handle_timer_event(event) {
                    break;
                }
            }
        }

        assert_eq!(session.view().phase, Phase::Done);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(session.pump_timer(), 0);
    }
}
