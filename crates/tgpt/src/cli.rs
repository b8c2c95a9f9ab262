//! CLI argument parsing for tgpt
//!
//! Parsing happens in two passes. The raw tokens are checked first for
//! arity, repeated flags and the `-s`/`-l` conflict, then clap turns them
//! into a [`Cli`] which is validated into an [`Invocation`].

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::Parser;
use thiserror::Error;

/// One-line usage hint printed after argument errors
pub const USAGE: &str = "Usage: tgpt <command> [-f] [-l | -s <N>]";

/// Word limit when neither `-s` nor `-l` is given
pub const DEFAULT_WORD_LIMIT: u32 = 150;

/// Word limit for `-l`
pub const LONG_WORD_LIMIT: u32 = 500;

/// A command plus at most three flag tokens (`-f -s N`)
const MAX_ARGS: usize = 4;

/// Argument errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgError {
    #[error("invalid arguments: expected a command and at most three flags, got {0} argument(s)")]
    Arity(usize),

    #[error("invalid arguments: duplicate flag {0}")]
    Duplicate(String),

    #[error("invalid arguments: -s and -l cannot be used together")]
    Conflict,

    #[error("invalid arguments: unknown argument {0}")]
    Unknown(String),

    #[error("invalid arguments: invalid size {0:?}, expected a non-negative number")]
    InvalidSize(String),

    #[error("invalid arguments: {0}")]
    Usage(String),

    /// `--help` or `--version` was requested; holds the rendered text
    #[error("{0}")]
    Help(String),
}

#[derive(Parser, Debug)]
#[command(name = "tgpt")]
#[command(version)]
#[command(about = "Explain a UNIX command in a few words")]
#[command(long_about = "Explain a UNIX command in a few words.\n\n\
    tgpt checks that the command has a manual entry, asks a language model\n\
    to summarise it within a word limit, and prints the answer in a box.\n\
    The API key is read from OPENAI_API_KEY.")]
#[command(after_help = "EXAMPLES:\n\
    tgpt ls\n\
    tgpt tar -l\n\
    tgpt rsync -s 40\n\
    tgpt my-script -f\n\n\
CONFIGURATION:\n\
    ~/.config/tgpt/config.toml")]
pub struct Cli {
    /// Command to explain
    pub command: String,

    /// Skip the manual entry check
    #[arg(short = 'f', long = "force")]
    pub force: bool,

    /// Long answer (up to 500 words)
    #[arg(short = 'l', long = "long")]
    pub long: bool,

    /// Answer in at most N words
    #[arg(
        short = 's',
        long = "size",
        value_name = "N",
        allow_hyphen_values = true,
        conflicts_with = "long"
    )]
    pub size: Option<String>,
}

/// A validated request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The command whose manual entry is explained
    pub command: String,

    /// Skip the manual check
    pub force: bool,

    /// Maximum number of words in the answer
    pub word_limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flag {
    Force,
    Long,
    Size,
}

impl Flag {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "-f" | "--force" => Some(Self::Force),
            "-l" | "--long" => Some(Self::Long),
            "-s" | "--size" => Some(Self::Size),
            _ => None,
        }
    }
}

/// Parse and validate the arguments following the program name
pub fn parse_args(args: &[String]) -> Result<Invocation, ArgError> {
    if args.is_empty() || args.len() > MAX_ARGS {
        return Err(ArgError::Arity(args.len()));
    }

    check_flags(args)?;

    let argv = std::iter::once("tgpt").chain(args.iter().map(String::as_str));
    let cli = Cli::try_parse_from(argv).map_err(from_clap)?;

    Invocation::try_from(cli)
}

/// Reject repeated flags and `-s` together with `-l`
fn check_flags(args: &[String]) -> Result<(), ArgError> {
    let mut seen = Vec::with_capacity(args.len());

    for token in args {
        let Some(flag) = Flag::from_token(token) else {
            continue;
        };
        if seen.contains(&flag) {
            return Err(ArgError::Duplicate(token.clone()));
        }
        seen.push(flag);
    }

    if seen.contains(&Flag::Size) && seen.contains(&Flag::Long) {
        return Err(ArgError::Conflict);
    }

    Ok(())
}

impl TryFrom<Cli> for Invocation {
    type Error = ArgError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        if cli.command.trim().is_empty() {
            return Err(ArgError::Usage("command must not be empty".to_string()));
        }
        if cli.command.starts_with('-') {
            return Err(ArgError::Usage(format!(
                "command must not start with '-': {}",
                cli.command
            )));
        }

        let word_limit = match (cli.long, cli.size) {
            (true, Some(_)) => return Err(ArgError::Conflict),
            (true, None) => LONG_WORD_LIMIT,
            (false, Some(raw)) => parse_size(&raw)?,
            (false, None) => DEFAULT_WORD_LIMIT,
        };

        Ok(Self {
            command: cli.command,
            force: cli.force,
            word_limit,
        })
    }
}

fn parse_size(raw: &str) -> Result<u32, ArgError> {
    let n: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ArgError::InvalidSize(raw.to_string()))?;

    u32::try_from(n).map_err(|_| ArgError::InvalidSize(raw.to_string()))
}

fn context_string(err: &clap::Error, kind: ContextKind) -> Option<String> {
    match err.get(kind)? {
        ContextValue::String(s) => Some(s.clone()),
        ContextValue::Strings(v) => v.first().cloned(),
        _ => None,
    }
}

fn from_clap(err: clap::Error) -> ArgError {
    match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => ArgError::Help(err.to_string()),
        ErrorKind::UnknownArgument => ArgError::Unknown(
            context_string(&err, ContextKind::InvalidArg).unwrap_or_else(|| "?".to_string()),
        ),
        ErrorKind::ArgumentConflict => {
            let arg = context_string(&err, ContextKind::InvalidArg);
            let prior = context_string(&err, ContextKind::PriorArg);
            match (arg, prior) {
                (Some(arg), Some(prior)) if arg == prior => ArgError::Duplicate(arg),
                _ => ArgError::Conflict,
            }
        }
        _ => {
            let rendered = err.to_string();
            let first = rendered.lines().next().unwrap_or_default();
            ArgError::Usage(first.trim_start_matches("error: ").to_string())
        }
    }
}
