//! Auto-advance countdown.
//!
//! After a submission the session may advance on its own once a configured
//! delay has elapsed. The countdown runs as a tokio task that never touches
//! engine state: it only sends generation-tagged [`TimerEvent`]s, and the
//! owner decides whether an event is still current.
//!
//! Remaining time is recomputed from a fixed deadline on every tick rather
//! than decremented, so a late tick cannot accumulate drift. The final wait
//! is cut short to land on the deadline itself.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

/// A message from a running countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Periodic progress report.
    Tick { generation: u64, remaining: Duration },
    /// The countdown reached zero. Sent at most once per start.
    Fired { generation: u64 },
}

impl TimerEvent {
    pub fn generation(&self) -> u64 {
        match self {
            TimerEvent::Tick { generation, .. } | TimerEvent::Fired { generation } => *generation,
        }
    }
}

/// Cancellable countdown that requests an advance when it expires.
///
/// At most one countdown runs at a time: `start` aborts the previous task
/// before spawning a new one. Dropping the timer cancels it.
pub struct AutoAdvanceTimer {
    duration: Duration,
    tick: Duration,
    tx: mpsc::UnboundedSender<TimerEvent>,
    rx: mpsc::UnboundedReceiver<TimerEvent>,
    task: Option<JoinHandle<()>>,
    generation: Option<u64>,
}

impl AutoAdvanceTimer {
    pub fn new(duration: Duration, tick: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            duration,
            tick: tick.min(duration).max(Duration::from_millis(1)),
            tx,
            rx,
            task: None,
            generation: None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Generation of the running countdown, if any.
    pub fn active_generation(&self) -> Option<u64> {
        self.task
            .as_ref()
            .filter(|task| !task.is_finished())
            .and(self.generation)
    }

    /// Start a countdown for `generation`, replacing any running one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, generation: u64) {
        self.cancel();

        let tx = self.tx.clone();
        let duration = self.duration;
        let tick = self.tick;
        self.generation = Some(generation);
        self.task = Some(tokio::spawn(async move {
            let started = Instant::now();
            let deadline = started + duration;
            let mut next_tick = started + tick;
            loop {
                // Ticks never overshoot the deadline.
                time::sleep_until(next_tick.min(deadline)).await;
                let now = Instant::now();
                let remaining = deadline.saturating_duration_since(now);
                if remaining.is_zero() {
                    let _ = tx.send(TimerEvent::Fired { generation });
                    break;
                }
                if tx.send(TimerEvent::Tick { generation, remaining }).is_err() {
                    break;
                }
                while next_tick <= now {
                    next_tick += tick;
                }
            }
        }));
        tracing::debug!(
            generation,
            duration_ms = duration.as_millis() as u64,
            "auto-advance started"
        );
    }

    /// Stop the running countdown and drop any events it already queued.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            if let Some(generation) = self.generation.take() {
                tracing::debug!(generation, "auto-advance cancelled");
            }
        }
        while self.rx.try_recv().is_ok() {}
    }

    /// Wait for the next countdown event.
    pub async fn recv(&mut self) -> Option<TimerEvent> {
        self.rx.recv().await
    }

    /// Take an already-queued event without waiting.
    pub fn try_recv(&mut self) -> Option<TimerEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for AutoAdvanceTimer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
