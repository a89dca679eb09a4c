//! Completion payload handed to the course player, with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::policy::PassSummary;

/// The single result a finished quiz task reports to its host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionPayload {
    /// Unique id for this task instance.
    pub session_id: Uuid,
    /// Host routing tag, passed through unchanged.
    pub task_type: String,
    pub completed: bool,
    pub passed: bool,
    pub main_correct: usize,
    pub redemption_correct: usize,
    pub total_correct: usize,
    pub total_questions: usize,
    pub required_correct: usize,
    /// `total_correct / total_questions`.
    pub pass_rate: f64,
    /// Incorrect redemption attempts that were retried.
    #[serde(default)]
    pub discarded_attempts: usize,
    pub completed_at: DateTime<Utc>,
}

impl CompletionPayload {
    pub fn new(
        session_id: Uuid,
        task_type: &str,
        summary: &PassSummary,
        discarded_attempts: usize,
    ) -> Self {
        let pass_rate = if summary.total_questions == 0 {
            0.0
        } else {
            summary.total_correct as f64 / summary.total_questions as f64
        };
        Self {
            session_id,
            task_type: task_type.to_string(),
            completed: true,
            passed: summary.passed,
            main_correct: summary.main_correct,
            redemption_correct: summary.redemption_correct,
            total_correct: summary.total_correct,
            total_questions: summary.total_questions,
            required_correct: summary.required_correct,
            pass_rate,
            discarded_attempts,
            completed_at: Utc::now(),
        }
    }

    /// Save the payload as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize payload")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write payload to {}", path.display()))?;
        Ok(())
    }

    /// Load a payload from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read payload from {}", path.display()))?;
        let payload: CompletionPayload =
            serde_json::from_str(&content).context("failed to parse payload JSON")?;
        Ok(payload)
    }

    /// Format the payload as a markdown summary.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let verdict = if self.passed { "passed" } else { "not passed" };

        md.push_str(&format!("**{}**: {verdict}\n\n", self.task_type));
        md.push_str("| Main | Redemption | Total | Required | Questions | Rate |\n");
        md.push_str("|------|------------|-------|----------|-----------|------|\n");
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {:.1}% |\n",
            self.main_correct,
            self.redemption_correct,
            self.total_correct,
            self.required_correct,
            self.total_questions,
            self.pass_rate * 100.0
        ));
        if self.discarded_attempts > 0 {
            md.push_str(&format!(
                "\n{} redemption attempt(s) retried.\n",
                self.discarded_attempts
            ));
        }

        md
    }
}
