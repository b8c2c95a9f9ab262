//! Configuration loading for tgpt
//!
//! Sources, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. `~/.config/tgpt/config.toml`
//! 3. `OPENAI_BASE_URL` (endpoint override)
//!
//! The credential is only ever read from `OPENAI_API_KEY`. It is never taken
//! from the config file.

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::paths::Paths;

/// Environment variable holding the API credential
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Environment variable overriding the API endpoint
pub const BASE_URL_VAR: &str = "OPENAI_BASE_URL";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("can not access key (OPENAI_API_KEY is not set)")]
    MissingKey,

    #[error("invalid config file {}: {:#}", .path.display(), .source)]
    File {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// Resolved tgpt configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Credential for the completion API
    pub api_key: String,

    /// Completion API endpoint, without the `/v1/...` path
    pub base_url: String,

    /// Model identifier sent with each request
    pub model: String,

    /// Response length cap
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Extra attempts after a transient failure
    pub max_retries: u32,

    /// Delay before the first retry, doubled on each attempt
    pub retry_delay: Duration,

    /// Manual lookup program
    pub manual_program: String,

    /// Arguments passed before the command name
    pub manual_args: Vec<String>,

    /// Upper bound on the manual lookup
    pub manual_timeout: Duration,
}

/// Optional overrides read from `config.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub request_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,

    #[serde(default)]
    pub manual: ManualFileConfig,
}

/// `[manual]` table of `config.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManualFileConfig {
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo-instruct".to_string()
}

fn default_manual_args() -> Vec<String> {
    vec!["-w".to_string()]
}

impl FileConfig {
    /// Read overrides from `path`. A missing file yields no overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        Self::read(path).map_err(|source| ConfigError::File {
            path: path.to_path_buf(),
            source,
        })
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        toml::from_str(&content).with_context(|| format!("Failed to parse config from {:?}", path))
    }
}

fn require_key(api_key: Option<String>) -> Result<String, ConfigError> {
    api_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or(ConfigError::MissingKey)
}

impl Config {
    /// Load configuration from the environment and the user config file
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(
            &Paths::new().config_file(),
            std::env::var(API_KEY_VAR).ok(),
            std::env::var(BASE_URL_VAR).ok(),
        )
    }

    /// Load configuration from `path`. The credential is checked before the
    /// file is read, so a missing key is always the reported error.
    pub fn load_from(
        path: &Path,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = require_key(api_key)?;
        let file = FileConfig::load(path)?;

        Self::from_parts(file, Some(api_key), base_url)
    }

    /// Build a config from already-gathered sources
    pub fn from_parts(
        file: FileConfig,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = require_key(api_key)?;

        let base_url = base_url
            .filter(|u| !u.trim().is_empty())
            .or(file.base_url)
            .unwrap_or_else(default_base_url)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            api_key,
            base_url,
            model: file.model.unwrap_or_else(default_model),
            max_tokens: file.max_tokens.unwrap_or(1024),
            temperature: file.temperature.unwrap_or(0.7),
            request_timeout: Duration::from_secs(file.request_timeout_secs.unwrap_or(60)),
            max_retries: file.max_retries.unwrap_or(2),
            retry_delay: Duration::from_millis(file.retry_delay_ms.unwrap_or(500)),
            manual_program: file.manual.program.unwrap_or_else(|| "man".to_string()),
            manual_args: file.manual.args.unwrap_or_else(default_manual_args),
            manual_timeout: Duration::from_secs(file.manual.timeout_secs.unwrap_or(10)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_key_is_fatal() {
        let err = Config::from_parts(FileConfig::default(), None, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey));

        let err = Config::from_parts(FileConfig::default(), Some("  ".into()), None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey));
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_parts(FileConfig::default(), Some("sk-test".into()), None).unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.base_url, "https://api.openai.com");
        assert_eq!(config.model, "gpt-3.5-turbo-instruct");
        assert_eq!(config.max_tokens, 1024);
        assert!(config.temperature > 0.0);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.manual_program, "man");
        assert_eq!(config.manual_args, vec!["-w"]);
        assert_eq!(config.manual_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_env_base_url_wins_over_file() {
        let file = FileConfig {
            base_url: Some("http://from-file".into()),
            ..Default::default()
        };
        let config =
            Config::from_parts(file, Some("k".into()), Some("http://from-env/".into())).unwrap();
        assert_eq!(config.base_url, "http://from-env");
    }

    #[test]
    fn test_load_file_overrides() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
model = "davinci-002"
max_tokens = 256
max_retries = 0

[manual]
program = "whatis"
args = []
timeout_secs = 3
"#,
        )
        .unwrap();

        let file = FileConfig::load(&path).unwrap();
        let config = Config::from_parts(file, Some("k".into()), None).unwrap();
        assert_eq!(config.model, "davinci-002");
        assert_eq!(config.max_tokens, 256);
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.manual_program, "whatis");
        assert!(config.manual_args.is_empty());
        assert_eq!(config.manual_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_missing_key_reported_before_bad_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "this is [not toml\n").unwrap();

        let err = Config::load_from(&path, None, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey));

        let err = Config::load_from(&path, Some("k".into()), None).unwrap_err();
        assert!(matches!(err, ConfigError::File { .. }));
    }

    #[test]
    fn test_load_from_without_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_from(&temp.path().join("absent.toml"), Some("k".into()), None).unwrap();
        assert_eq!(config.model, "gpt-3.5-turbo-instruct");
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let file = FileConfig::load(&temp.path().join("nope.toml")).unwrap();
        assert!(file.model.is_none());
    }

    #[test]
    fn test_bad_file_names_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "api_key = \"should not live here\"\n").unwrap();

        let err = FileConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::File { .. }));
        assert!(err.to_string().contains("config.toml"));
    }
}
