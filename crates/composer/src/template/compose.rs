//! Batching of placeholders into a single generation request.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::ai::prompts::{BatchItemContext, ExpandPlaceholdersContext, EXPAND_PLACEHOLDERS};
use crate::ai::{
    parse_ai_response, AIMessage, AIProvider, AIResponse, GenerateOptions, ModelProvider,
    PromptManager, ProviderRegistry, TokenUsage,
};
use crate::config::AiConfig;
use crate::errors::{ComposerError, ComposerResult};

use super::Placeholder;

/// Output budget for one batch call.
const BATCH_MAX_TOKENS: u32 = 8192;

/// Outcome of [`compose`].
#[derive(Debug, Clone, PartialEq)]
pub enum ComposedRequest {
    /// Nothing to generate: no context, or no placeholders anywhere.
    Empty,
    Batch(GenerationRequest),
}

/// Every placeholder of one generation cycle, pooled in order.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub global_context: String,
    pub items: Vec<Placeholder>,
}

/// Generated text for one placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedFragment {
    pub text: String,
}

/// Fragments returned for a [`GenerationRequest`], in request order.
#[derive(Debug, Clone, Default)]
pub struct GenerationResult {
    pub items: Vec<GeneratedFragment>,
    /// Number of items the model actually returned
    pub returned: usize,
    pub usage: TokenUsage,
}

/// Pool placeholder groups into one request.
///
/// Groups keep their order and placeholders keep their order within a group.
/// Returns [`ComposedRequest::Empty`] when the context is blank or there is
/// nothing to generate, in which case no completion call may be made.
pub fn compose<'a, I>(global_context: &str, groups: I) -> ComposedRequest
where
    I: IntoIterator<Item = &'a [Placeholder]>,
{
    if global_context.trim().is_empty() {
        return ComposedRequest::Empty;
    }

    let items: Vec<Placeholder> = groups.into_iter().flatten().cloned().collect();
    if items.is_empty() {
        return ComposedRequest::Empty;
    }

    ComposedRequest::Batch(GenerationRequest {
        global_context: global_context.to_string(),
        items,
    })
}

impl GenerationRequest {
    /// Prompt context with items numbered from 1.
    pub fn prompt_context(&self) -> ExpandPlaceholdersContext {
        ExpandPlaceholdersContext {
            global_context: self.global_context.clone(),
            item_count: self.items.len(),
            items: self
                .items
                .iter()
                .enumerate()
                .map(|(i, p)| BatchItemContext {
                    number: i + 1,
                    prompt: p.prompt.clone(),
                    system: p.system.clone(),
                    max_lines: p.max_lines,
                })
                .collect(),
        }
    }

    /// Render the system and user messages for this batch.
    pub fn messages(&self, prompts: &PromptManager) -> ComposerResult<Vec<AIMessage>> {
        let (system, user) = prompts.render(EXPAND_PLACEHOLDERS, &self.prompt_context())?;
        Ok(vec![AIMessage::system(system), AIMessage::user(user)])
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BatchPayload {
    Object { items: Vec<BatchItem> },
    List(Vec<BatchItem>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BatchItem {
    Indexed {
        #[serde(default)]
        index: Option<usize>,
        #[serde(default)]
        text: String,
    },
    Text(String),
}

impl BatchPayload {
    fn into_items(self) -> Vec<BatchItem> {
        match self {
            Self::Object { items } | Self::List(items) => items,
        }
    }
}

/// Order returned items into request order.
///
/// When every item carries a distinct index in `1..=expected`, items are
/// placed by index and gaps stay empty; otherwise positional order is used.
fn order_items(items: Vec<BatchItem>, expected: usize) -> Vec<GeneratedFragment> {
    let indices: Vec<Option<usize>> = items
        .iter()
        .map(|item| match item {
            BatchItem::Indexed { index, .. } => *index,
            BatchItem::Text(_) => None,
        })
        .collect();

    let mut seen = vec![false; expected];
    let indexed = indices.iter().all(|index| match index {
        Some(i) if (1..=expected).contains(i) && !seen[i - 1] => {
            seen[i - 1] = true;
            true
        }
        _ => false,
    });

    let texts = items.into_iter().map(|item| match item {
        BatchItem::Indexed { text, .. } | BatchItem::Text(text) => text.trim().to_string(),
    });

    if !indexed {
        return texts.map(|text| GeneratedFragment { text }).collect();
    }

    let len = indices.iter().flatten().max().copied().unwrap_or(0);
    let mut ordered = vec![GeneratedFragment::default(); len];
    for (index, text) in indices.into_iter().flatten().zip(texts) {
        ordered[index - 1] = GeneratedFragment { text };
    }
    ordered
}

/// Issues batch requests against the configured model.
pub struct BatchComposer {
    registry: ProviderRegistry,
    model: ModelProvider,
    prompts: PromptManager,
    timeout: Duration,
    temperature: f32,
}

impl BatchComposer {
    /// Create a composer from explicit AI settings.
    pub fn new(config: &AiConfig) -> Self {
        Self {
            registry: ProviderRegistry::from_config(config),
            model: config.resolved_model(),
            prompts: PromptManager::default(),
            timeout: config.timeout(),
            temperature: config.temperature,
        }
    }

    /// Create a composer around a single provider.
    pub fn with_provider(provider: Arc<dyn AIProvider>, model: ModelProvider) -> Self {
        let mut registry = ProviderRegistry::new();
        registry.register(model.kind(), provider);
        let defaults = AiConfig::default();
        Self {
            registry,
            model,
            prompts: PromptManager::default(),
            timeout: defaults.timeout(),
            temperature: defaults.temperature,
        }
    }

    /// Set the timeout for a single completion call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &ModelProvider {
        &self.model
    }

    pub fn prompts(&self) -> &PromptManager {
        &self.prompts
    }

    /// Pool placeholder groups; see [`compose`].
    pub fn compose<'a, I>(&self, global_context: &str, groups: I) -> ComposedRequest
    where
        I: IntoIterator<Item = &'a [Placeholder]>,
    {
        compose(global_context, groups)
    }

    /// Run one completion call, aborting it after the configured timeout.
    #[instrument(skip(self, messages), fields(model = %self.model))]
    pub async fn complete(
        &self,
        messages: &[AIMessage],
        max_tokens: u32,
    ) -> ComposerResult<AIResponse> {
        let provider = self.registry.require(&self.model)?;
        let options = GenerateOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(max_tokens),
            json_mode: true,
        };

        let call = provider.generate_text(self.model.model_id(), messages, &options);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout = ?self.timeout, "AI completion timed out");
                Err(ComposerError::AiTimeout {
                    seconds: self.timeout.as_secs(),
                })
            }
        }
    }

    /// Generate every item of the batch with exactly one completion call.
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn generate(&self, request: &GenerationRequest) -> ComposerResult<GenerationResult> {
        let messages = request.messages(&self.prompts)?;
        debug!(items = request.items.len(), "Sending placeholder batch");

        let response = self.complete(&messages, BATCH_MAX_TOKENS).await?;
        let payload: BatchPayload = parse_ai_response(&response)?;
        let items = payload.into_items();
        let returned = items.len();

        info!(
            items = request.items.len(),
            returned,
            tokens = response.usage.total_tokens,
            "Placeholder batch generated"
        );

        Ok(GenerationResult {
            items: order_items(items, request.items.len()),
            returned,
            usage: response.usage,
        })
    }
}
