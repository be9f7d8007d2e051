use crate::http_client::HttpClient;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MODEL: &str = "claude-3-haiku-20240307";
/// Output ceiling: generous enough for a full status update, small enough
/// that candidates rarely overrun the 280-character posting limit. A hint,
/// not a guarantee; the publisher still checks.
const MAX_TOKENS: u32 = 100;
const TEMPERATURE: f64 = 0.7;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("text generation failed: {0}")]
    Service(String),
}

/// A candidate status update produced by the generator.
///
/// Trimmed on construction. The posting length limit is enforced by the
/// publisher, never assumed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMessage(String);

impl GeneratedMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into().trim().to_string())
    }

    pub fn text(&self) -> &str {
        &self.0
    }

    /// Length in Unicode scalar values.
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Display for GeneratedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait MessageGenerator: Send + Sync {
    /// Turns an operator prompt into one candidate message.
    ///
    /// Exactly one request, no retries: generation failures are rare and
    /// cheap to re-trigger by re-running, and retrying a possibly malformed
    /// prompt would only burn quota.
    async fn generate(&self, prompt: &str) -> Result<GeneratedMessage, GenerationError>;
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: String,
}

/// Generator backed by the Anthropic Messages API.
pub struct ClaudeGenerator {
    http: Arc<dyn HttpClient>,
    api_key: String,
}

impl ClaudeGenerator {
    pub fn new(http: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
        }
    }

    fn build_prompt(prompt: &str) -> String {
        format!(
            "Write one short social media post based on this request: \"{prompt}\".\n\
             Reply with the post text only - no surrounding quotes, no commentary.\n\
             Keep it under 280 characters."
        )
    }

    fn parse_response(body: &str) -> Result<GeneratedMessage, GenerationError> {
        let response: MessagesResponse = serde_json::from_str(body)
            .map_err(|e| GenerationError::Service(format!("unexpected response shape: {e}")))?;
        let text = response
            .content
            .first()
            .map(|block| block.text.trim())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(GenerationError::Service(
                "service returned no candidate text".to_string(),
            ));
        }
        Ok(GeneratedMessage::new(text))
    }
}

#[async_trait]
impl MessageGenerator for ClaudeGenerator {
    async fn generate(&self, prompt: &str) -> Result<GeneratedMessage, GenerationError> {
        info!("Requesting one candidate from the text generation service");

        let request_body = json!({
            "model": MODEL,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
            "messages": [
                {
                    "role": "user",
                    "content": Self::build_prompt(prompt)
                }
            ]
        });

        let response = self
            .http
            .post_json(
                MESSAGES_URL,
                &[
                    ("x-api-key", self.api_key.as_str()),
                    ("content-type", "application/json"),
                    ("anthropic-version", ANTHROPIC_VERSION),
                ],
                &request_body,
            )
            .await
            .map_err(|e| GenerationError::Service(e.to_string()))?;

        if !response.is_success() {
            warn!("Generation request returned HTTP {}", response.status);
            return Err(GenerationError::Service(format!(
                "service returned HTTP {}",
                response.status
            )));
        }

        Self::parse_response(&response.body)
    }
}

/// Deterministic generator for mock mode and end-to-end tests.
pub struct MockGenerator;

impl MockGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<GeneratedMessage, GenerationError> {
        info!("Using mock generator ({})", crate::config::MOCK_ENV);
        Ok(mock_message(prompt))
    }
}

fn mock_message(prompt: &str) -> GeneratedMessage {
    // Canned outputs keyed on prompt patterns, shaped like plausible
    // service output.
    let text = if prompt.contains("technology") {
        "Technology is best when it brings people together and turns brave ideas into daily habits."
            .to_string()
    } else if prompt.contains("saga") {
        // Deliberately over the posting limit, to exercise the length check.
        format!("{}The saga continues!!", "The saga continues. ".repeat(14))
    } else {
        format!("A small thought on {prompt}: begin before you feel ready.")
    };
    GeneratedMessage::new(text)
}
