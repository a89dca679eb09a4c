//! The `coursequiz validate` command.

use std::path::PathBuf;

use anyhow::Result;

use coursequiz_core::parser;

pub fn execute(quiz_path: PathBuf) -> Result<()> {
    let quizzes = parser::load_quizzes(&quiz_path)?;

    if quizzes.is_empty() {
        anyhow::bail!("no valid quizzes found in {}", quiz_path.display());
    }

    let mut total_warnings = 0;

    for quiz in &quizzes {
        let name = if quiz.title.is_empty() { &quiz.id } else { &quiz.title };
        println!(
            "Quiz: {name} [{}] ({} questions)",
            quiz.task_type,
            quiz.questions.len()
        );

        let warnings = parser::validate_quiz(quiz);
        for w in &warnings {
            let prefix = w
                .question_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All quizzes valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
