#![warn(clippy::pedantic)]
// Allow common pedantic lints that don't affect correctness
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]

//! # Composer
//!
//! Template-driven composition of Jira issues.
//!
//! Project and task codes each own a Jira wiki markup template. Templates
//! may contain `<AI prompt="..." />` placeholders; one generation cycle
//! pools every placeholder of every template involved into a single
//! completion call and splices the answers back in place.
//!
//! This crate provides:
//! - Placeholder extraction, batching and splicing (`template`)
//! - Gemini and OpenAI completion providers (`ai`)
//! - File-based code storage in `.composer/` (`store`)
//! - Epic and story drafting from notes (`drafts`)
//! - Issue plans and Jira issue creation (`issues`, `jira`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use composer::{BatchComposer, ComposerConfig, TemplateExpander};
//!
//! let config = ComposerConfig::load(".").await?;
//! let expander = TemplateExpander::new(BatchComposer::new(&config.ai));
//!
//! let expansion = expander
//!     .expand_templates("Checkout redesign", [("WEB", "h2. Goal\n<AI prompt=\"goal\" />")])
//!     .await?;
//! ```

// Error types
pub mod errors;

// Configuration
pub mod config;

// AI integration
pub mod ai;

// Placeholder pipeline
pub mod template;

// Code storage
pub mod store;

// Domain facades
pub mod drafts;
pub mod issues;

// Jira REST client
pub mod jira;

// Terminal UI helpers
pub mod ui;

pub use ai::{
    AIMessage, AIProvider, AIResponse, AIRole, GenerateOptions, ModelProvider, PromptManager,
    ProviderKind, ProviderRegistry, TokenUsage,
};
pub use config::{AiConfig, ComposerConfig, JiraConfig};
pub use drafts::{DraftDomain, Drafts, EpicDraft, StoryDraft};
pub use errors::{ComposerError, ComposerResult};
pub use issues::{push_plan, IssueDraft, IssuePlan, IssuePlanner, IssueRequest, PushedPlan};
pub use jira::{CreatedIssue, IssueFields, JiraClient};
pub use store::{CodeKind, CodeRecord, CodeStore, FileCodeStore, MemoryCodeStore};
pub use template::{
    compose, extract, splice, BatchComposer, ComposedRequest, ExpandedDocument, Expansion,
    ExpansionWarning, Placeholder, Skeleton, TemplateExpander, TemplateId,
};
