//! AI Provider trait and common types.
//!
//! Defines the interface that every text completion backend implements.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::errors::{ComposerError, ComposerResult};

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AIRole {
    /// System message (persona / instruction)
    System,
    /// User message (input)
    User,
    /// Assistant message (AI response)
    Assistant,
}

/// A message in a conversation with an AI model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AIMessage {
    /// Role of the message sender
    pub role: AIRole,
    /// Content of the message
    pub content: String,
}

impl AIMessage {
    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: AIRole::System,
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: AIRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: AIRole::Assistant,
            content: content.into(),
        }
    }
}

/// Token usage information from an AI response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of input tokens
    pub input_tokens: u32,
    /// Number of output tokens
    pub output_tokens: u32,
    /// Total tokens (input + output)
    pub total_tokens: u32,
}

impl std::ops::Add for TokenUsage {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            input_tokens: self.input_tokens.saturating_add(other.input_tokens),
            output_tokens: self.output_tokens.saturating_add(other.output_tokens),
            total_tokens: self.total_tokens.saturating_add(other.total_tokens),
        }
    }
}

/// Response from an AI model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AIResponse {
    /// Generated text content
    pub text: String,
    /// Token usage information
    pub usage: TokenUsage,
    /// Model that generated the response
    pub model: String,
    /// Provider that generated the response
    pub provider: String,
}

/// Options for text generation.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Temperature for sampling (0.0 to 1.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Whether to request JSON output
    pub json_mode: bool,
}

/// Trait for AI providers.
///
/// Implementations must report quota exhaustion as
/// [`ComposerError::AiRateLimitExceeded`] so callers can tell it apart from
/// other failures.
#[async_trait]
pub trait AIProvider: Send + Sync {
    /// Get the provider name (e.g., "gemini", "openai").
    fn name(&self) -> &'static str;

    /// Check if the provider is configured (has API key).
    fn is_configured(&self) -> bool;

    /// Generate text from messages.
    async fn generate_text(
        &self,
        model: &str,
        messages: &[AIMessage],
        options: &GenerateOptions,
    ) -> ComposerResult<AIResponse>;
}

/// Markers providers put in error bodies when a quota or rate limit is hit.
const RATE_LIMIT_INDICATORS: &[&str] = &[
    "rate limit",
    "rate_limit",
    "insufficient_quota",
    "exceeded your current quota",
    "resource_exhausted",
    "too many requests",
];

/// Check whether an error response signals quota exhaustion.
pub fn is_rate_limited(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    let lower = body.to_lowercase();
    RATE_LIMIT_INDICATORS
        .iter()
        .any(|indicator| lower.contains(indicator))
}

/// Map a non-success provider response to an error.
pub(crate) fn error_from_response(
    provider: &str,
    status: StatusCode,
    body: &str,
    message: Option<&str>,
) -> ComposerError {
    if is_rate_limited(status, body) {
        tracing::warn!(provider, %status, "AI provider reported quota exhaustion");
        return ComposerError::AiRateLimitExceeded;
    }
    match message {
        Some(message) => ComposerError::Ai(format!("{provider} API error ({status}): {message}")),
        None => ComposerError::Ai(format!("{provider} API error ({status}): {body}")),
    }
}

/// Parse a structured object out of an AI response.
///
/// This is a standalone function rather than a trait method because
/// generic methods are not dyn-compatible.
pub fn parse_ai_response<T: for<'de> Deserialize<'de>>(response: &AIResponse) -> ComposerResult<T> {
    let text = response.text.trim();

    // Models sometimes wrap JSON in markdown code blocks
    let json_text = if text.starts_with("```json") {
        text.strip_prefix("```json")
            .and_then(|s| s.strip_suffix("```"))
            .unwrap_or(text)
            .trim()
    } else if text.starts_with("```") {
        text.strip_prefix("```")
            .and_then(|s| s.strip_suffix("```"))
            .unwrap_or(text)
            .trim()
    } else {
        text
    };

    serde_json::from_str(json_text).map_err(|e| ComposerError::AiResponseParseError {
        reason: format!("Failed to parse AI response as JSON: {e}. Response: {text}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(text: &str) -> AIResponse {
        AIResponse {
            text: text.to_string(),
            usage: TokenUsage::default(),
            model: "test".to_string(),
            provider: "test".to_string(),
        }
    }

    #[derive(Debug, Deserialize)]
    struct Payload {
        value: i32,
    }

    #[test]
    fn test_parse_plain_json() {
        let parsed: Payload = parse_ai_response(&response(r#"{"value": 3}"#)).unwrap();
        assert_eq!(parsed.value, 3);
    }

    #[test]
    fn test_parse_fenced_json() {
        let parsed: Payload =
            parse_ai_response(&response("```json\n{\"value\": 7}\n```")).unwrap();
        assert_eq!(parsed.value, 7);
    }

    #[test]
    fn test_parse_garbage_is_parse_error() {
        let err = parse_ai_response::<Payload>(&response("sorry, I can't")).unwrap_err();
        assert!(matches!(err, ComposerError::AiResponseParseError { .. }));
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(is_rate_limited(StatusCode::TOO_MANY_REQUESTS, ""));
        assert!(is_rate_limited(
            StatusCode::FORBIDDEN,
            r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#
        ));
        assert!(is_rate_limited(
            StatusCode::BAD_REQUEST,
            "You exceeded your current quota"
        ));
        assert!(!is_rate_limited(StatusCode::INTERNAL_SERVER_ERROR, "boom"));
        assert!(!is_rate_limited(
            StatusCode::FORBIDDEN,
            "Your application is authenticating by using local Application Default Credentials; quota project not set"
        ));
        assert!(!is_rate_limited(StatusCode::BAD_REQUEST, "invalid quota_project_id"));
    }

    #[test]
    fn test_error_from_response_prefers_message() {
        let err = error_from_response(
            "openai",
            StatusCode::BAD_REQUEST,
            "{}",
            Some("invalid model"),
        );
        assert!(err.to_string().contains("invalid model"));
        assert!(!err.is_retryable());
    }
}
