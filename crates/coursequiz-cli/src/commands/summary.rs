//! The `coursequiz summary` command.

use std::path::PathBuf;

use anyhow::Result;

use coursequiz_core::CompletionPayload;

pub fn execute(payload_path: PathBuf, format: String) -> Result<()> {
    let payload = CompletionPayload::load_json(&payload_path)?;

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", payload.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        _ => {
            // text format
            let verdict = if payload.passed { "PASSED" } else { "NOT PASSED" };
            println!("{} ({}): {verdict}", payload.task_type, payload.session_id);
            println!(
                "  correct: {}/{} (required {}, {:.1}%)",
                payload.total_correct,
                payload.total_questions,
                payload.required_correct,
                payload.pass_rate * 100.0
            );
            println!(
                "  main round: {}, redemption: {}",
                payload.main_correct, payload.redemption_correct
            );
            if payload.discarded_attempts > 0 {
                println!("  retried redemption attempts: {}", payload.discarded_attempts);
            }
            println!("  completed at: {}", payload.completed_at.to_rfc3339());
        }
    }

    Ok(())
}
