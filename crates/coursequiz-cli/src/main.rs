//! coursequiz CLI: a terminal host for adaptive course quizzes.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "coursequiz", version, about = "Adaptive course quiz player")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a quiz interactively
    Play {
        /// Path to a .toml or .json quiz file
        #[arg(long)]
        quiz: PathBuf,

        /// Override the quiz's task type tag
        #[arg(long)]
        task_type: Option<String>,

        /// Minimum pass rate (0.0 - 1.0)
        #[arg(long)]
        pass_rate: Option<f64>,

        /// Auto-advance delay after each answer in ms (0 disables)
        #[arg(long)]
        auto_advance_ms: Option<u64>,

        /// Directory for the completion payload
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate quiz files
    Validate {
        /// Path to a quiz file or directory
        #[arg(long)]
        quiz: PathBuf,
    },

    /// Summarize a saved completion payload
    Summary {
        /// Completion payload JSON
        #[arg(long)]
        payload: PathBuf,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Create starter config and example quiz
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("coursequiz=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Play {
            quiz,
            task_type,
            pass_rate,
            auto_advance_ms,
            output,
            config,
        } => {
            commands::play::execute(quiz, task_type, pass_rate, auto_advance_ms, output, config)
                .await
        }
        Commands::Validate { quiz } => commands::validate::execute(quiz),
        Commands::Summary { payload, format } => commands::summary::execute(payload, format),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
