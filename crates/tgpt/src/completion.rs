//! Completion client
//!
//! Sends the prompt to an OpenAI-style `/v1/completions` endpoint and pulls
//! the `{"Q": ..., "A": ...}` object out of the first choice.
//!
//! Transient failures (connection errors, timeouts, HTTP 429 and 5xx) are
//! retried with exponential backoff up to `max_retries` times. Everything
//! else fails immediately.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tgpt_core::Config;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::prompt::build_prompt;

/// Completion errors
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("failed to reach completion service: {0}")]
    Network(#[source] reqwest::Error),

    #[error("completion request timed out")]
    Timeout,

    #[error("completion service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unreadable response from completion service: {0}")]
    InvalidResponse(String),

    #[error("completion service returned no choices")]
    NoChoices,

    #[error("model answer is not a JSON object with \"Q\" and \"A\" fields: {raw:?}")]
    MalformedAnswer { raw: String },
}

/// Something that turns a prompt into completion text
pub trait CompletionBackend {
    fn complete(&self, prompt: &str)
        -> impl Future<Output = Result<String, CompletionError>> + Send;
}

/// The model's parsed reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    /// The question as the model restated it
    pub question: String,

    /// The explanation
    pub answer: String,
}

#[derive(Deserialize)]
struct RawAnswer {
    #[serde(rename = "Q")]
    question: Value,

    #[serde(rename = "A")]
    answer: Value,
}

impl RawAnswer {
    fn into_answer(self) -> Option<Answer> {
        if self.question.is_null() || self.answer.is_null() {
            return None;
        }

        Some(Answer {
            question: value_to_text(self.question),
            answer: value_to_text(self.answer),
        })
    }
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn try_parse(text: &str) -> Option<Answer> {
    serde_json::from_str::<RawAnswer>(text)
        .ok()
        .and_then(RawAnswer::into_answer)
}

/// Parse the model's reply into an [`Answer`].
///
/// The whole trimmed text is tried first. Failing that, the span from the
/// first `{` to the last `}` is tried, which covers replies wrapped in a
/// sentence or a code fence. Anything else is a `MalformedAnswer`.
pub fn parse_answer(text: &str) -> Result<Answer, CompletionError> {
    let trimmed = text.trim();

    if let Some(answer) = try_parse(trimmed) {
        return Ok(answer);
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Some(answer) = try_parse(&trimmed[start..=end]) {
                debug!("Recovered answer object from surrounding text");
                return Ok(answer);
            }
        }
    }

    Err(CompletionError::MalformedAnswer {
        raw: text.to_string(),
    })
}

/// Ask `backend` to explain `command` in at most `word_limit` words
pub async fn explain<B: CompletionBackend>(
    backend: &B,
    command: &str,
    word_limit: u32,
) -> Result<Answer, CompletionError> {
    let prompt = build_prompt(command, word_limit);
    let text = backend.complete(&prompt).await?;
    parse_answer(&text)
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    text: String,
}

/// Whether a failed attempt may be retried
enum Attempt {
    Retry(CompletionError),
    Fatal(CompletionError),
}

/// Client for the OpenAI completions API
pub struct OpenAiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    max_retries: u32,
    retry_delay: Duration,
}

impl OpenAiClient {
    pub fn new(config: &Config) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(CompletionError::Network)?;

        Ok(Self {
            client,
            endpoint: format!("{}/v1/completions", config.base_url),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
        })
    }

    async fn attempt(&self, request: &CompletionRequest<'_>) -> Result<String, Attempt> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Attempt::Retry(CompletionError::Timeout)
                } else if e.is_builder() {
                    Attempt::Fatal(CompletionError::Network(e))
                } else {
                    Attempt::Retry(CompletionError::Network(e))
                }
            })?;

        let status = response.status();
        debug!(%status, "Completion response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = CompletionError::Api {
                status: status.as_u16(),
                message: extract_error_message(&body),
            };

            return Err(if status.is_server_error() || status.as_u16() == 429 {
                Attempt::Retry(err)
            } else {
                Attempt::Fatal(err)
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                Attempt::Retry(CompletionError::Timeout)
            } else {
                Attempt::Retry(CompletionError::Network(e))
            }
        })?;

        let parsed: CompletionResponse = serde_json::from_str(&body)
            .map_err(|e| Attempt::Fatal(CompletionError::InvalidResponse(e.to_string())))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .ok_or(Attempt::Fatal(CompletionError::NoChoices))
    }
}

impl CompletionBackend for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let mut attempt = 0;
        loop {
            debug!(
                attempt = attempt + 1,
                of = self.max_retries + 1,
                model = %self.model,
                "Requesting completion"
            );

            match self.attempt(&request).await {
                Ok(text) => return Ok(text),
                Err(Attempt::Retry(e)) if attempt < self.max_retries => {
                    let delay = self.retry_delay.saturating_mul(1 << attempt.min(16));
                    warn!(error = %e, ?delay, "Completion attempt failed, retrying");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(Attempt::Retry(e)) | Err(Attempt::Fatal(e)) => return Err(e),
            }
        }
    }
}

/// Pull a readable message out of an API error body
fn extract_error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(msg) = json
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return msg.to_string();
        }
        if let Some(msg) = json.get("message").and_then(|m| m.as_str()) {
            return msg.to_string();
        }
    }

    if body.trim().is_empty() {
        "no details".to_string()
    } else {
        body.trim().to_string()
    }
}
