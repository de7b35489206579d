//! Google Gemini provider implementation.
//!
//! Talks to the `generateContent` endpoint of the Generative Language API.
//! System messages are folded into `systemInstruction`; the remaining
//! messages become `contents`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::errors::{ComposerError, ComposerResult};

use super::provider::{
    error_from_response, AIMessage, AIProvider, AIResponse, AIRole, GenerateOptions, TokenUsage,
};

/// Generative Language API root
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_field_names)]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: UsageMetadata,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

/// Google Gemini provider.
pub struct GeminiProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider with an API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: Some(api_key.into()),
            base_url: GEMINI_API_BASE.to_string(),
        }
    }

    /// Set a custom API root.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Split messages into the system instruction and the conversation.
    fn build_request(messages: &[AIMessage], options: &GenerateOptions) -> GeminiRequest {
        let system: Vec<Part> = messages
            .iter()
            .filter(|m| m.role == AIRole::System)
            .map(|m| Part {
                text: m.content.clone(),
            })
            .collect();

        let contents = messages
            .iter()
            .filter(|m| m.role != AIRole::System)
            .map(|m| Content {
                role: Some(if m.role == AIRole::Assistant {
                    "model"
                } else {
                    "user"
                }),
                parts: vec![Part {
                    text: m.content.clone(),
                }],
            })
            .collect();

        GeminiRequest {
            system_instruction: (!system.is_empty()).then_some(Content {
                role: None,
                parts: system,
            }),
            contents,
            generation_config: GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
                response_mime_type: options.json_mode.then_some("application/json"),
            },
        }
    }
}

#[async_trait]
impl AIProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    #[instrument(skip(self, messages, options), fields(provider = "gemini"))]
    async fn generate_text(
        &self,
        model: &str,
        messages: &[AIMessage],
        options: &GenerateOptions,
    ) -> ComposerResult<AIResponse> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ComposerError::ProviderNotConfigured {
                provider: "gemini".to_string(),
            })?;

        let request = Self::build_request(messages, options);
        let url = format!("{}/models/{model}:generateContent", self.base_url);
        debug!(%url, "Sending Gemini generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ComposerError::Ai(format!("Gemini API request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ComposerError::Ai(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .ok()
                .map(|e| e.error.message);
            return Err(error_from_response(
                "Gemini",
                status,
                &body,
                message.as_deref(),
            ));
        }

        let api_response: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| ComposerError::Ai(format!("Failed to parse response: {e}")))?;

        let text = api_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        let usage = api_response.usage_metadata;
        Ok(AIResponse {
            text,
            usage: TokenUsage {
                input_tokens: usage.prompt_token_count,
                output_tokens: usage.candidates_token_count,
                total_tokens: usage.total_token_count,
            },
            model: api_response
                .model_version
                .unwrap_or_else(|| model.to_string()),
            provider: "gemini".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_system_messages_become_system_instruction() {
        let request = GeminiProvider::build_request(
            &[AIMessage::system("Be terse"), AIMessage::user("Hello")],
            &GenerateOptions {
                json_mode: true,
                ..Default::default()
            },
        );
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "Be terse");
        assert_eq!(value["contents"].as_array().unwrap().len(), 1);
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_generate_text_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
            .and(header("x-goog-api-key", "g-key"))
            .and(body_partial_json(json!({
                "systemInstruction": {"parts": [{"text": "persona"}]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "hello "}, {"text": "world"}]}}],
                "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2, "totalTokenCount": 6}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("g-key").with_base_url(format!("{}/v1beta", server.uri()));
        let response = provider
            .generate_text(
                "gemini-2.0-flash",
                &[AIMessage::system("persona"), AIMessage::user("hi")],
                &GenerateOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(response.text, "hello world");
        assert_eq!(response.usage.total_tokens, 6);
        assert_eq!(response.model, "gemini-2.0-flash");
    }

    #[tokio::test]
    async fn test_resource_exhausted_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}
            })))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("g-key").with_base_url(format!("{}/v1beta", server.uri()));
        let err = provider
            .generate_text(
                "gemini-2.0-flash",
                &[AIMessage::user("hi")],
                &GenerateOptions::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ComposerError::AiRateLimitExceeded));
    }
}
