//! Provider and model selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ComposerError;

use super::{gemini, openai};

/// A supported completion backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    #[serde(rename = "openai")]
    OpenAI,
}

impl ProviderKind {
    /// Provider name as used in configuration and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAI => "openai",
        }
    }

    /// Model used when the configuration does not name one.
    pub fn default_model(self) -> ModelProvider {
        match self {
            Self::Gemini => ModelProvider::Gemini(gemini::DEFAULT_MODEL.to_string()),
            Self::OpenAI => ModelProvider::OpenAI(openai::DEFAULT_MODEL.to_string()),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ComposerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAI),
            other => Err(ComposerError::InvalidConfigValue {
                key: "provider".to_string(),
                reason: format!("unknown provider '{other}' (expected gemini or openai)"),
            }),
        }
    }
}

/// A model bound to the provider that serves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", content = "modelId", rename_all = "lowercase")]
pub enum ModelProvider {
    Gemini(String),
    #[serde(rename = "openai")]
    OpenAI(String),
}

impl ModelProvider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Gemini(_) => ProviderKind::Gemini,
            Self::OpenAI(_) => ProviderKind::OpenAI,
        }
    }

    pub fn model_id(&self) -> &str {
        match self {
            Self::Gemini(id) | Self::OpenAI(id) => id,
        }
    }
}

impl fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.model_id())
    }
}

impl FromStr for ModelProvider {
    type Err = ComposerError;

    /// Parses `provider:model`, or a bare model id whose provider is
    /// recognisable from its name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (kind, model) = match s.split_once(':') {
            Some((provider, model)) => (provider.parse::<ProviderKind>()?, model.trim()),
            None if s.starts_with("gemini") => (ProviderKind::Gemini, s),
            None if s.starts_with("gpt") || s.starts_with("o1") || s.starts_with("o3") => {
                (ProviderKind::OpenAI, s)
            }
            None => {
                return Err(ComposerError::ModelNotSupported {
                    model: format!("{s} (prefix it with gemini: or openai:)"),
                })
            }
        };

        if model.is_empty() {
            return Err(ComposerError::InvalidConfigValue {
                key: "model".to_string(),
                reason: "model id is empty".to_string(),
            });
        }

        Ok(match kind {
            ProviderKind::Gemini => Self::Gemini(model.to_string()),
            ProviderKind::OpenAI => Self::OpenAI(model.to_string()),
        })
    }
}
