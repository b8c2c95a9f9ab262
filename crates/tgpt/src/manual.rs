//! Manual entry lookup
//!
//! Runs the system's manual locator (`man -w <command>` by default) and only
//! looks at its exit status. Anything other than a clean exit 0 counts as
//! "no entry", including a locator that cannot be started or hangs.

use std::process::Stdio;
use std::time::Duration;

use tgpt_core::Config;
use tokio::process::Command;
use tracing::{debug, warn};

/// Outcome of a manual lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualLookup {
    Found,
    NotFound,
}

impl ManualLookup {
    pub fn is_found(self) -> bool {
        self == Self::Found
    }
}

/// Checks whether commands have a manual entry
#[derive(Debug, Clone)]
pub struct ManualChecker {
    /// Locator program
    program: String,

    /// Arguments placed before the command name
    args: Vec<String>,

    /// How long to wait for the locator
    timeout: Duration,
}

impl ManualChecker {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.manual_program.clone(),
            config.manual_args.clone(),
            config.manual_timeout,
        )
    }

    /// Look up `command`. The name is passed as a single argument after
    /// `--`, never through a shell and never as a locator option.
    pub async fn check(&self, command: &str) -> ManualLookup {
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg("--")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        let mut child = match child {
            Ok(c) => c,
            Err(e) => {
                warn!(program = %self.program, error = %e, "Failed to spawn manual lookup");
                return ManualLookup::NotFound;
            }
        };

        // On timeout the child is killed when it is dropped
        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) if status.success() => {
                debug!(command, "Manual entry found");
                ManualLookup::Found
            }
            Ok(Ok(status)) => {
                debug!(command, %status, "No manual entry");
                ManualLookup::NotFound
            }
            Ok(Err(e)) => {
                warn!(program = %self.program, error = %e, "Manual lookup failed");
                ManualLookup::NotFound
            }
            Err(_) => {
                warn!(
                    program = %self.program,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Manual lookup timed out"
                );
                ManualLookup::NotFound
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(program: &str, args: &[&str]) -> ManualChecker {
        ManualChecker::new(
            program,
            args.iter().map(|s| s.to_string()).collect(),
            Duration::from_secs(5),
        )
    }

    /// A fake locator that only knows about `ls`
    fn only_ls() -> ManualChecker {
        checker("sh", &["-c", "[ \"$1\" = -- ] && shift; test \"$1\" = ls", "sh"])
    }

    /// A getopt-style fake locator: succeeds on `--help` or `-h` seen as
    /// options, stops option parsing at `--`, and otherwise knows no pages
    fn getopt_locator() -> ManualChecker {
        let script = r#"for a in "$@"; do case "$a" in --) shift; break;; --help|-h) exit 0;; esac; done; exit 16"#;
        checker("sh", &["-c", script, "man", "-w"])
    }

    #[tokio::test]
    async fn test_exit_zero_is_found() {
        assert_eq!(checker("true", &[]).check("ls").await, ManualLookup::Found);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_not_found() {
        assert_eq!(checker("false", &[]).check("ls").await, ManualLookup::NotFound);
    }

    #[tokio::test]
    async fn test_command_name_reaches_locator() {
        let checker = only_ls();
        assert!(checker.check("ls").await.is_found());
        assert!(!checker.check("qwzxnonsense").await.is_found());
    }

    #[tokio::test]
    async fn test_command_name_is_not_shell_expanded() {
        let checker = only_ls();
        assert_eq!(checker.check("ls; true").await, ManualLookup::NotFound);
        assert_eq!(checker.check("$(echo ls)").await, ManualLookup::NotFound);
    }

    #[tokio::test]
    async fn test_dash_command_is_not_read_as_locator_option() {
        let checker = getopt_locator();
        assert_eq!(checker.check("--help").await, ManualLookup::NotFound);
        assert_eq!(checker.check("-h").await, ManualLookup::NotFound);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_not_found() {
        let checker = checker("/nonexistent/tgpt-no-such-locator", &[]);
        assert_eq!(checker.check("ls").await, ManualLookup::NotFound);
    }

    #[tokio::test]
    async fn test_timeout_is_not_found() {
        let checker = ManualChecker::new("sleep", vec![], Duration::from_millis(100));
        let start = std::time::Instant::now();
        assert_eq!(checker.check("10").await, ManualLookup::NotFound);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    #[ignore = "needs man-db and the ls manual page installed"]
    async fn test_real_manual_lookup() {
        let checker = checker("man", &["-w"]);
        assert!(checker.check("ls").await.is_found());
        assert!(!checker.check("qwzxnonsense-command").await.is_found());
    }
}
