//! tgpt - Explain a UNIX command in a few words
//!
//! tgpt checks that a command has a manual entry, asks a language model to
//! summarise it within a word limit, and prints the answer in an 80-column box.
//!
//! # Examples
//!
//! ```bash
//! tgpt ls            # up to 150 words
//! tgpt tar -l        # up to 500 words
//! tgpt rsync -s 40   # up to 40 words
//! tgpt my-script -f  # skip the manual check
//! ```

mod app;
mod cli;
mod completion;
mod error;
mod manual;
mod prompt;

use std::env;
use std::process::ExitCode;

use colored::Colorize;
use tgpt_core::Config;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::ArgError;
use crate::completion::OpenAiClient;
use crate::error::TgptError;
use crate::manual::ManualChecker;

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries only the box
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();

    match try_main(&args) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => report(&err),
    }
}

fn try_main(args: &[String]) -> Result<String, TgptError> {
    let invocation = cli::parse_args(args)?;
    debug!(?invocation, "Parsed arguments");

    // The credential must be present before any network call is attempted
    let config = Config::load()?;

    let checker = ManualChecker::from_config(&config);
    let backend = OpenAiClient::new(&config)?;

    let rt = tokio::runtime::Runtime::new().map_err(TgptError::Runtime)?;
    rt.block_on(async {
        tokio::select! {
            result = app::run(&invocation, &checker, &backend) => result,
            Ok(()) = tokio::signal::ctrl_c() => Err(TgptError::Interrupted),
        }
    })
}

/// Print an error and pick the exit status
fn report(err: &TgptError) -> ExitCode {
    if let TgptError::Args(ArgError::Help(text)) = err {
        print!("{}", text);
        return ExitCode::SUCCESS;
    }

    eprintln!("{} {}", "error:".red(), err);
    if err.shows_usage() {
        eprintln!("{}", cli::USAGE);
    }

    ExitCode::from(err.exit_code())
}
