//! Top-level flow: manual check, completion, boxing

use tgpt_core::format::{boxed, BOX_WIDTH};
use tracing::info;

use crate::cli::Invocation;
use crate::completion::{explain, CompletionBackend};
use crate::error::TgptError;
use crate::manual::ManualChecker;

/// Explain the invoked command and return the boxed answer
pub async fn run<B: CompletionBackend>(
    invocation: &Invocation,
    checker: &ManualChecker,
    backend: &B,
) -> Result<String, TgptError> {
    if invocation.force {
        info!(command = %invocation.command, "Skipping manual check");
    } else if !checker.check(&invocation.command).await.is_found() {
        return Err(TgptError::NotInManual(invocation.command.clone()));
    }

    let answer = explain(backend, &invocation.command, invocation.word_limit).await?;
    info!(question = %answer.question, "Received answer");

    Ok(boxed(&answer.answer, BOX_WIDTH))
}
