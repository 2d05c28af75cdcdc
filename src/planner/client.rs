//! OpenAI-compatible planner client.
//!
//! Sends non-streaming chat completion requests to the configured
//! endpoint with Bearer authentication. One blocking round trip per call:
//! no engine-level retry, no total request timeout — a hang or rejection
//! propagates to the one operation that asked, never to the session.

use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use super::config::PlannerConfig;
use super::errors::PlannerError;

// ─── Constants ───────────────────────────────────────────────────────────────

/// TCP connection timeout. Distinguishes "can't reach planner" from a slow
/// generation; no total request timeout is set on purpose.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Token budget for planner responses. Plans and summaries are small
/// structured documents; this is headroom, not a target.
const MAX_TOKENS: u32 = 2048;

// ─── Wire Types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

// ─── PlannerClient ───────────────────────────────────────────────────────────

/// Client for the planner endpoint.
#[derive(Debug)]
pub struct PlannerClient {
    http: HttpClient,
    config: PlannerConfig,
}

impl PlannerClient {
    /// Create a new planner client.
    ///
    /// Verifies the credential is present (fail fast, before any network
    /// activity) but does NOT check connectivity — that happens on the
    /// first request.
    pub fn new(config: PlannerConfig) -> Result<Self, PlannerError> {
        config.require_credential()?;

        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| PlannerError::ConnectionFailed {
                endpoint: config.base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { http, config })
    }

    /// The model name this client sends with every request.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send one prompt, get text back.
    ///
    /// The full conversation is a single user message; all per-peer
    /// guidance is inlined into the prompt by the caller.
    pub async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, PlannerError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            temperature,
            max_tokens: MAX_TOKENS,
        };

        tracing::debug!(
            url = %url,
            model = %body.model,
            prompt_chars = prompt.len(),
            temperature = temperature,
            "planner request"
        );

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| PlannerError::ConnectionFailed {
                endpoint: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(PlannerError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let body_text = response
            .text()
            .await
            .map_err(|e| PlannerError::MalformedResponse {
                reason: format!("failed to read response body: {e}"),
            })?;

        extract_content(&body_text)
    }
}

/// Pull the generated text out of a chat-completions response body.
fn extract_content(body: &str) -> Result<String, PlannerError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| PlannerError::MalformedResponse {
            reason: format!("failed to decode completion envelope: {e}"),
        })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.is_empty())
        .ok_or(PlannerError::MalformedResponse {
            reason: "completion contained no content".into(),
        })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(key: &str) -> PlannerConfig {
        PlannerConfig::new(key, "http://localhost:9/v1", "test-model")
    }

    #[test]
    fn test_new_rejects_missing_credential() {
        let err = PlannerClient::new(test_config("")).unwrap_err();
        assert!(matches!(err, PlannerError::MissingCredential { .. }));
    }

    #[test]
    fn test_new_accepts_credential() {
        let client = PlannerClient::new(test_config("sk-test")).unwrap();
        assert_eq!(client.model(), "test-model");
    }

    #[test]
    fn test_extract_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "hello");
    }

    #[test]
    fn test_extract_content_empty_choices() {
        let body = r#"{"choices":[]}"#;
        let err = extract_content(body).unwrap_err();
        assert!(matches!(err, PlannerError::MalformedResponse { .. }));
    }

    #[test]
    fn test_extract_content_null_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        assert!(extract_content(body).is_err());
    }

    #[test]
    fn test_extract_content_bad_envelope() {
        assert!(extract_content("<html>502</html>").is_err());
    }
}
