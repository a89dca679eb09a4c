//! The `coursequiz init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("coursequiz.toml").exists() {
        println!("coursequiz.toml already exists, skipping.");
    } else {
        std::fs::write("coursequiz.toml", SAMPLE_CONFIG)?;
        println!("Created coursequiz.toml");
    }

    std::fs::create_dir_all("quizzes")?;
    let example_path = Path::new("quizzes/example.toml");
    if example_path.exists() {
        println!("quizzes/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_QUIZ)?;
        println!("Created quizzes/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: coursequiz validate --quiz quizzes/example.toml");
    println!("  2. Run: coursequiz play --quiz quizzes/example.toml");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# coursequiz configuration

output_dir = "./coursequiz-results"

[engine]
# Fraction of questions that must end up correct (0.0 - 1.0).
minimum_pass_rate = 0.8
# Advance automatically this long after each answer. 0 disables.
auto_advance_ms = 0
tick_ms = 100
"#;

const EXAMPLE_QUIZ: &str = r#"[quiz]
id = "example"
title = "Example Quiz"
description = "A short quiz to get started"
task_type = "practice"

[[questions]]
id = "hola"
kind = "single_choice"
prompt = "What does 'hola' mean?"
options = ["goodbye", "hello", "thanks"]
answer_index = 1
explanation = "'Hola' is the everyday Spanish greeting."

[[questions]]
id = "colors"
kind = "multi_select"
prompt = "Which of these are colors?"
options = ["rojo", "perro", "azul"]
answer_indices = [0, 2]
explanation = "'Rojo' is red and 'azul' is blue. 'Perro' is a dog."

[[questions]]
id = "animals"
kind = "match_pairs"
prompt = "Match each word to its translation"
left = [{ id = "dog", label = "dog" }, { id = "cat", label = "cat" }]
right = [{ id = "gato", label = "gato" }, { id = "perro", label = "perro" }]
answer_map = { dog = "perro", cat = "gato" }
explanation = "Dog is 'perro', cat is 'gato'."
"#;
