//! AI integration.
//!
//! This module provides:
//! - AI provider abstraction (Gemini, OpenAI)
//! - Closed provider/model selection
//! - Prompt template system with Handlebars
//! - Provider registry built from explicit configuration

pub mod model;
pub mod prompts;
pub mod provider;
pub mod registry;

// Provider implementations
pub mod gemini;
pub mod openai;

// Re-exports
pub use model::{ModelProvider, ProviderKind};
pub use prompts::{PromptManager, PromptTemplate};
pub use provider::{
    is_rate_limited, parse_ai_response, AIMessage, AIProvider, AIResponse, AIRole,
    GenerateOptions, TokenUsage,
};
pub use registry::ProviderRegistry;
