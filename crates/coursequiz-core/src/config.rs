//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::QuizError;

/// Configuration for a round controller and its session driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fraction of questions that must be answered correctly.
    #[serde(default = "default_pass_rate")]
    pub minimum_pass_rate: f64,
    /// Delay before a submitted answer advances on its own (0 = disabled).
    #[serde(default)]
    pub auto_advance_ms: u64,
    /// How often the auto-advance countdown reports remaining time.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_pass_rate() -> f64 {
    0.8
}

fn default_tick_ms() -> u64 {
    100
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            minimum_pass_rate: default_pass_rate(),
            auto_advance_ms: 0,
            tick_ms: default_tick_ms(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), QuizError> {
        if !self.minimum_pass_rate.is_finite() || !(0.0..=1.0).contains(&self.minimum_pass_rate) {
            return Err(QuizError::InvalidPassRate(self.minimum_pass_rate));
        }
        Ok(())
    }

    /// The auto-advance delay, or `None` when auto-advance is off.
    pub fn auto_advance(&self) -> Option<Duration> {
        (self.auto_advance_ms > 0).then(|| Duration::from_millis(self.auto_advance_ms))
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}
