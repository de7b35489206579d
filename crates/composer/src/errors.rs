//! Error types for the composer crate.

use thiserror::Error;

/// Error types for template expansion, code storage and issue creation
#[derive(Error, Debug, Clone)]
pub enum ComposerError {
    // Code store errors
    #[error("Code '{code}' not found")]
    CodeNotFound { code: String },

    #[error("Code '{code}' already exists")]
    CodeAlreadyExists { code: String },

    #[error("Storage error: {reason}")]
    StorageError { reason: String },

    #[error("Failed to read file '{path}': {reason}")]
    FileReadError { path: String, reason: String },

    #[error("Failed to write file '{path}': {reason}")]
    FileWriteError { path: String, reason: String },

    #[error("Failed to parse JSON: {reason}")]
    JsonParseError { reason: String },

    // Configuration errors
    #[error("Configuration error: {reason}")]
    ConfigError { reason: String },

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidConfigValue { key: String, reason: String },

    // AI errors
    #[error("AI generation failed: {0}")]
    Ai(String),

    #[error("AI provider not configured: {provider}")]
    ProviderNotConfigured { provider: String },

    #[error("AI model not supported: {model}")]
    ModelNotSupported { model: String },

    #[error("AI response parse error: {reason}")]
    AiResponseParseError { reason: String },

    #[error("AI quota exceeded, check your plan and billing details")]
    AiRateLimitExceeded,

    #[error("AI request timed out after {seconds}s, try again")]
    AiTimeout { seconds: u64 },

    // Jira errors
    #[error("Jira API error ({status}): {message}")]
    Jira { status: u16, message: String },

    #[error("Jira is not configured. Set JIRA_BASE_URL, JIRA_EMAIL and JIRA_API_TOKEN")]
    JiraNotConfigured,

    // General errors
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Internal error: {reason}")]
    Internal { reason: String },
}

impl ComposerError {
    /// Whether the caller may retry the same operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AiRateLimitExceeded | Self::AiTimeout { .. })
    }
}

impl From<std::io::Error> for ComposerError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageError {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ComposerError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonParseError {
            reason: err.to_string(),
        }
    }
}

/// Result type alias for composer operations
pub type ComposerResult<T> = Result<T, ComposerError>;
