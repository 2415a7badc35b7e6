//! Anthropic Messages API client.
//!
//! Only the live document intelligence provider talks to the model, and only
//! through this client. Requests run at temperature 0 so repeated scoring of the
//! same resume and job stays stable.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Model used when `LLM_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 2048;
const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Reply was not the expected JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Gave up after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("Reply contained no text")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<Block>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Block {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl MessagesResponse {
    /// All text blocks joined, trimmed. `None` when there is no text at all.
    fn into_text(self) -> Option<String> {
        let text: String = self
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

enum Attempt {
    Done(MessagesResponse),
    Retry(LlmError),
    Fail(LlmError),
}

#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    api_key: String,
    model: String,
    api_url: String,
}

impl LlmClient {
    pub fn new(api_key: String, model: String, api_url: String, timeout: Duration) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key,
            model,
            api_url,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one user message. Rate limits, server errors and transport errors are
    /// retried with exponential backoff; other client errors fail immediately.
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: 0.0,
            system,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error = None;
        for attempt in 1..=MAX_ATTEMPTS {
            if attempt > 1 {
                let delay = backoff(attempt);
                warn!("Retrying LLM call (attempt {attempt}/{MAX_ATTEMPTS}) in {}ms", delay.as_millis());
                tokio::time::sleep(delay).await;
            }

            match self.send(&body).await {
                Attempt::Done(response) => {
                    if let Some(usage) = &response.usage {
                        debug!(
                            "LLM call used {} input / {} output tokens",
                            usage.input_tokens, usage.output_tokens
                        );
                    }
                    return response.into_text().ok_or(LlmError::EmptyContent);
                }
                Attempt::Retry(e) => {
                    warn!("LLM call failed: {e}");
                    last_error = Some(e);
                }
                Attempt::Fail(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(LlmError::Exhausted {
            attempts: MAX_ATTEMPTS,
        }))
    }

    async fn send(&self, body: &MessagesRequest<'_>) -> Attempt {
        let response = match self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(LlmError::Http(e)),
        };

        let status = response.status();
        if status.is_success() {
            return match response.json::<MessagesResponse>().await {
                Ok(parsed) => Attempt::Done(parsed),
                Err(e) => Attempt::Fail(LlmError::Http(e)),
            };
        }

        let raw = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&raw)
            .map(|envelope| envelope.error.message)
            .unwrap_or(raw);
        let error = LlmError::Api {
            status: status.as_u16(),
            message,
        };
        if retryable(status) {
            Attempt::Retry(error)
        } else {
            Attempt::Fail(error)
        }
    }

    /// Asks for a JSON reply and decodes it into `T`. Code fences and prose
    /// around the JSON value are tolerated.
    pub async fn call_json<T: DeserializeOwned>(&self, prompt: &str, system: &str) -> Result<T, LlmError> {
        let text = self.complete(prompt, system).await?;
        Ok(serde_json::from_str(json_payload(&text))?)
    }

    /// Asks for a plain-text reply.
    pub async fn call_text(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        self.complete(prompt, system).await
    }
}

fn retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Delay before `attempt` (1-based): 1s before the second attempt, 2s before the third.
fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS << attempt.saturating_sub(2))
}

/// The JSON value inside a model reply: fenced block contents if fenced,
/// otherwise the span from the first `{`/`[` to the last `}`/`]`.
fn json_payload(text: &str) -> &str {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string (`json`, `JSON`, ...) on the opening fence line.
        let body = rest.split_once('\n').map_or("", |(_, body)| body);
        return body.trim_end().strip_suffix("```").unwrap_or(body).trim();
    }

    let start = text.find(['{', '[']);
    let end = text.rfind(['}', ']']);
    match (start, end) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_payload_strips_fences() {
        assert_eq!(json_payload("```json\n{\"score\": 80}\n```"), "{\"score\": 80}");
        assert_eq!(json_payload("```JSON\n[\"Python\"]\n```"), "[\"Python\"]");
        assert_eq!(json_payload("```\n[\"Python\", \"SQL\"]\n```"), "[\"Python\", \"SQL\"]");
    }

    #[test]
    fn test_json_payload_skips_surrounding_prose() {
        assert_eq!(
            json_payload("Here is the assessment: {\"score\": 55} Hope this helps."),
            "{\"score\": 55}"
        );
        assert_eq!(json_payload("  {\"name\": \"Ada\"}  "), "{\"name\": \"Ada\"}");
        assert_eq!(json_payload("No JSON here"), "No JSON here");
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(retryable(StatusCode::BAD_GATEWAY));
        assert!(!retryable(StatusCode::BAD_REQUEST));
        assert!(!retryable(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff(2), Duration::from_secs(1));
        assert_eq!(backoff(3), Duration::from_secs(2));
    }

    #[test]
    fn test_text_joins_text_blocks_only() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{
                "content": [
                    {"type": "tool_use"},
                    {"type": "text", "text": "  Strong backend "},
                    {"type": "text", "text": "profile. "}
                ],
                "usage": {"input_tokens": 3, "output_tokens": 4}
            }"#,
        )
        .unwrap();
        assert_eq!(response.into_text().as_deref(), Some("Strong backend profile."));
    }

    #[test]
    fn test_blank_reply_has_no_text() {
        let response: MessagesResponse =
            serde_json::from_str(r#"{"content": [{"type": "text", "text": "  "}]}"#).unwrap();
        assert!(response.into_text().is_none());
    }
}
