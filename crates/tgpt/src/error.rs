//! Error taxonomy for tgpt
//!
//! Every failure travels back to `main` as a [`TgptError`], which is the
//! only place the process exits.

use thiserror::Error;
use tgpt_core::config::ConfigError;

use crate::cli::ArgError;
use crate::completion::CompletionError;

/// Exit status for every failure
pub const FAILURE_EXIT_CODE: u8 = 255;

#[derive(Error, Debug)]
pub enum TgptError {
    #[error(transparent)]
    Args(#[from] ArgError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no entry for {0}")]
    NotInManual(String),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("interrupted")]
    Interrupted,
}

impl TgptError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Args(ArgError::Help(_)) => 0,
            _ => FAILURE_EXIT_CODE,
        }
    }

    /// Whether the usage line should follow the message
    pub fn shows_usage(&self) -> bool {
        matches!(self, Self::Args(e) if !matches!(e, ArgError::Help(_)))
    }
}
