//! The `coursequiz play` command.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;

use coursequiz_core::model::{MatchItem, QuestionKind};
use coursequiz_core::parser;
use coursequiz_core::store::JsonDirStore;
use coursequiz_core::traits::ProgressStore;
use coursequiz_core::{Answer, CompletionPayload, Phase, Question, QuizSession};

use crate::config::load_config_from;

pub async fn execute(
    quiz_path: PathBuf,
    task_type: Option<String>,
    pass_rate: Option<f64>,
    auto_advance_ms: Option<u64>,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let quiz = parser::parse_quiz(&quiz_path)?;

    // Precedence: flag > quiz file > env/config file > default
    let mut engine_config = quiz.engine_config(&config.engine);
    if let Some(rate) = pass_rate {
        engine_config.minimum_pass_rate = rate;
    }
    if let Some(ms) = auto_advance_ms {
        engine_config.auto_advance_ms = ms;
    }
    let task_type = task_type.unwrap_or_else(|| quiz.task_type.clone());

    let (tx, mut completed) = oneshot::channel::<CompletionPayload>();
    let mut session = QuizSession::new(quiz.questions.clone(), task_type, &engine_config)
        .with_context(|| format!("cannot play quiz '{}'", quiz.id))?
        .on_complete(move |payload| {
            let _ = tx.send(payload.clone());
        });

    let title = if quiz.title.is_empty() { &quiz.id } else { &quiz.title };
    println!(
        "{title}: {} questions, {:.0}% to pass",
        quiz.questions.len(),
        engine_config.minimum_pass_rate * 100.0
    );
    println!("Type an answer and press Enter. Empty line or 'next' continues, 'quit' stops.\n");
    render_question(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;
    while !session.is_done() {
        // Once input is gone only a pending countdown can move the quiz on.
        if !input_open && !(session.view().submitted && session.auto_advance_enabled()) {
            anyhow::bail!("input ended before the quiz was finished");
        }
        tokio::select! {
            line = lines.next_line(), if input_open => {
                match line.context("failed to read input")? {
                    Some(line) => handle_input(&mut session, line.trim())?,
                    None => input_open = false,
                }
            }
            event = session.next_timer_event() => {
                if session.handle_timer_event(event) {
                    after_advance(&session);
                }
            }
        }
    }

    let payload = completed
        .try_recv()
        .context("quiz finished without a completion payload")?;
    print_summary(&payload);

    let output_dir = output.unwrap_or(config.output_dir);
    let store = JsonDirStore::new(&output_dir);
    store.save(&payload).await?;
    tracing::debug!(store = store.name(), session = %payload.session_id, "payload saved");
    println!("Result saved to: {}", store.path_for(payload.session_id).display());

    Ok(())
}

fn handle_input(session: &mut QuizSession, input: &str) -> Result<()> {
    match input {
        "quit" | "q" => anyhow::bail!("quiz abandoned"),
        "" | "next" | "n" => {
            if session.view().submitted {
                session.advance();
                after_advance(session);
            } else {
                println!("Answer the question first.");
            }
            return Ok(());
        }
        _ => {}
    }

    if session.view().submitted {
        println!("Already answered. Press Enter to continue.");
        return Ok(());
    }
    let Some(question) = session.view().question.cloned() else {
        return Ok(());
    };

    let answer = match parse_answer(&question.kind, input) {
        Ok(answer) => answer,
        Err(e) => {
            println!("Could not read that answer: {e}");
            return Ok(());
        }
    };
    session.set_answer(answer);
    session.submit();

    let view = session.view();
    match view.last_verdict {
        Some(true) => println!("Correct!"),
        Some(false) => println!("Incorrect."),
        None => {
            println!("That answer is incomplete.");
            return Ok(());
        }
    }
    if let Some(explanation) = &question.explanation {
        println!("  {explanation}");
    }
    if let Some(remaining) = session.auto_advance_remaining() {
        println!("(continuing in {:.1}s)", remaining.as_secs_f64());
    }
    Ok(())
}

fn after_advance(session: &QuizSession) {
    let view = session.view();
    if view.phase == Phase::Done {
        return;
    }
    if view.phase == Phase::Redemption && view.position == 1 && !view.submitted {
        let retrying = session
            .controller()
            .history()
            .last()
            .is_some_and(|r| r.phase == Phase::Redemption);
        if !retrying {
            println!(
                "\nRedemption round: {} question(s) to get right.",
                view.round_len
            );
        }
    }
    render_question(session);
}

fn render_question(session: &QuizSession) {
    let view = session.view();
    let Some(question) = view.question else {
        return;
    };

    println!("\n[{} {}/{}] {}", view.phase, view.position, view.round_len, question.prompt());
    render_options(question);
}

fn render_options(question: &Question) {
    match &question.kind {
        QuestionKind::SingleChoice { options, .. } => print_options(options),
        QuestionKind::ImageChoice { image, options, .. } => {
            println!("  (image: {image})");
            print_options(options);
        }
        QuestionKind::AudioChoice { audio, options, .. } => {
            println!("  (audio: {audio})");
            print_options(options);
        }
        QuestionKind::MultiSelect { options, .. } => {
            print_options(options);
            println!("  Select all that apply, e.g. 0,2");
        }
        QuestionKind::MatchPairs { left, right, .. } => {
            let label = |i: &MatchItem| format!("{}={}", i.id, i.label);
            let lefts: Vec<String> = left.iter().map(label).collect();
            let rights: Vec<String> = right.iter().map(label).collect();
            println!("  left:  {}", lefts.join("  "));
            println!("  right: {}", rights.join("  "));
            println!("  Match as left=right pairs, e.g. {}", example_pairs(question));
        }
        QuestionKind::MultiBlank { blanks, .. } => {
            for (n, blank) in blanks.iter().enumerate() {
                let options: Vec<String> = blank
                    .options
                    .iter()
                    .enumerate()
                    .map(|(i, o)| format!("{i}) {o}"))
                    .collect();
                println!("  blank {}: {}", n + 1, options.join("  "));
            }
            println!("  One choice per blank, e.g. 0,1");
        }
    }
}

fn print_options(options: &[String]) {
    for (i, option) in options.iter().enumerate() {
        println!("  {i}) {option}");
    }
}

fn example_pairs(question: &Question) -> String {
    match &question.kind {
        QuestionKind::MatchPairs { left, right, .. } => left
            .iter()
            .zip(right.iter())
            .take(2)
            .map(|(l, r)| format!("{}={}", l.id, r.id))
            .collect::<Vec<_>>()
            .join(","),
        _ => String::new(),
    }
}

/// Read a typed answer in the shape the question kind expects.
fn parse_answer(kind: &QuestionKind, input: &str) -> Result<Answer> {
    let parse_index = |s: &str| -> Result<usize> {
        s.trim()
            .parse::<usize>()
            .map_err(|_| anyhow::anyhow!("'{}' is not an option number", s.trim()))
    };

    match kind {
        QuestionKind::SingleChoice { .. }
        | QuestionKind::ImageChoice { .. }
        | QuestionKind::AudioChoice { .. } => Ok(Answer::Choice(parse_index(input)?)),
        QuestionKind::MultiSelect { .. } => {
            let selected = input
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(parse_index)
                .collect::<Result<BTreeSet<_>>>()?;
            Ok(Answer::Selection(selected))
        }
        QuestionKind::MatchPairs { .. } => {
            let pairs = input
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|pair| {
                    let (left, right) = pair.split_once('=').ok_or_else(|| {
                        anyhow::anyhow!("'{}' is not a left=right pair", pair.trim())
                    })?;
                    Ok((left.trim().to_string(), right.trim().to_string()))
                })
                .collect::<Result<BTreeMap<_, _>>>()?;
            Ok(Answer::Pairs(pairs))
        }
        QuestionKind::MultiBlank { .. } => {
            let blanks = input
                .split(',')
                .map(|s| match s.trim() {
                    "_" | "" => Ok(None),
                    other => parse_index(other).map(Some),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Answer::Blanks(blanks))
        }
    }
}

fn print_summary(payload: &CompletionPayload) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec![
        "Task",
        "Result",
        "Main",
        "Redemption",
        "Total",
        "Required",
        "Rate",
    ]);
    table.add_row(vec![
        Cell::new(&payload.task_type),
        Cell::new(if payload.passed { "passed" } else { "not passed" }),
        Cell::new(payload.main_correct),
        Cell::new(payload.redemption_correct),
        Cell::new(format!("{}/{}", payload.total_correct, payload.total_questions)),
        Cell::new(payload.required_correct),
        Cell::new(format!("{:.1}%", payload.pass_rate * 100.0)),
    ]);

    println!("\n{table}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursequiz_core::model::Blank;

    fn single() -> QuestionKind {
        QuestionKind::SingleChoice {
            prompt: "?".into(),
            options: vec!["a".into(), "b".into()],
            answer_index: 0,
        }
    }

    #[test]
    fn parse_choice_and_selection() {
        assert_eq!(parse_answer(&single(), " 1 ").unwrap(), Answer::Choice(1));
        assert!(parse_answer(&single(), "b").is_err());

        let multi = QuestionKind::MultiSelect {
            prompt: "?".into(),
            options: vec!["a".into(), "b".into(), "c".into()],
            answer_indices: BTreeSet::from([0, 2]),
        };
        assert_eq!(
            parse_answer(&multi, "2, 0").unwrap(),
            Answer::Selection(BTreeSet::from([0, 2]))
        );
    }

    #[test]
    fn parse_pairs_and_blanks() {
        let item = |id: &str| MatchItem {
            id: id.into(),
            label: id.into(),
        };
        let pairs = QuestionKind::MatchPairs {
            prompt: "?".into(),
            left: vec![item("dog")],
            right: vec![item("perro")],
            answer_map: BTreeMap::from([("dog".to_string(), "perro".to_string())]),
        };
        assert_eq!(
            parse_answer(&pairs, "dog = perro").unwrap(),
            Answer::Pairs(BTreeMap::from([("dog".to_string(), "perro".to_string())]))
        );
        assert!(parse_answer(&pairs, "dog perro").is_err());

        let blanks = QuestionKind::MultiBlank {
            prompt: "?".into(),
            blanks: vec![
                Blank {
                    options: vec!["soy".into(), "estoy".into()],
                    answer_index: 0,
                },
                Blank {
                    options: vec!["vivo".into(), "vive".into()],
                    answer_index: 0,
                },
            ],
        };
        assert_eq!(
            parse_answer(&blanks, "1,_").unwrap(),
            Answer::Blanks(vec![Some(1), None])
        );
    }
}
