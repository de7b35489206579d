//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use composer::ai::{AIMessage, AIProvider, AIResponse, GenerateOptions, TokenUsage};
use composer::template::{BatchComposer, TemplateExpander};
use composer::{ComposerError, ComposerResult, ModelProvider};
use serde_json::json;
use tokio::sync::RwLock;

type Reply = dyn Fn(&[AIMessage]) -> ComposerResult<String> + Send + Sync;

// =============================================================================
// Recording Provider
// =============================================================================

/// Provider that counts calls, keeps the last prompt and answers from a closure.
pub struct RecordingProvider {
    calls: AtomicUsize,
    last_messages: RwLock<Vec<AIMessage>>,
    delay: Option<Duration>,
    reply: Box<Reply>,
}

impl RecordingProvider {
    pub fn new<F>(reply: F) -> Arc<Self>
    where
        F: Fn(&[AIMessage]) -> ComposerResult<String> + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            last_messages: RwLock::new(Vec::new()),
            delay: None,
            reply: Box::new(reply),
        })
    }

    /// Answer every batch with `texts` as positional items.
    pub fn batch(texts: &[&str]) -> Arc<Self> {
        let body = batch_body(texts);
        Self::new(move |_| Ok(body.clone()))
    }

    /// Sleep before answering.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            last_messages: RwLock::new(Vec::new()),
            delay: Some(delay),
            reply: Box::new(|_| Ok(r#"{"items":[]}"#.to_string())),
        })
    }

    /// Fail every call with a quota error.
    pub fn rate_limited() -> Arc<Self> {
        Self::new(|_| Err(ComposerError::AiRateLimitExceeded))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn last_user_prompt(&self) -> Option<String> {
        self.last_messages
            .read()
            .await
            .iter()
            .rev()
            .find(|m| m.role == composer::AIRole::User)
            .map(|m| m.content.clone())
    }
}

#[async_trait]
impl AIProvider for RecordingProvider {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn generate_text(
        &self,
        model: &str,
        messages: &[AIMessage],
        _options: &GenerateOptions,
    ) -> ComposerResult<AIResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.write().await = messages.to_vec();

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let text = (self.reply)(messages)?;
        Ok(AIResponse {
            text,
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
                total_tokens: 15,
            },
            model: model.to_string(),
            provider: "recording".to_string(),
        })
    }
}

/// A positional batch response body.
pub fn batch_body(texts: &[&str]) -> String {
    json!({ "items": texts }).to_string()
}

pub fn model() -> ModelProvider {
    ModelProvider::Gemini("gemini-2.0-flash".to_string())
}

pub fn batch_composer(provider: Arc<RecordingProvider>) -> BatchComposer {
    BatchComposer::with_provider(provider, model())
}

pub fn expander(provider: Arc<RecordingProvider>) -> TemplateExpander {
    TemplateExpander::new(batch_composer(provider))
}
