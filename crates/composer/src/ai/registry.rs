//! Provider Registry - Holds the AI providers enabled by configuration.
//!
//! The registry is built from an explicit [`AiConfig`]; there is no
//! process-wide instance.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::AiConfig;
use crate::errors::{ComposerError, ComposerResult};

use super::gemini::GeminiProvider;
use super::model::{ModelProvider, ProviderKind};
use super::openai::OpenAIProvider;
use super::provider::AIProvider;

/// Registry of configured AI providers, keyed by kind.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn AIProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry with one provider per enabled, credentialed kind.
    pub fn from_config(config: &AiConfig) -> Self {
        let mut registry = Self::new();

        for kind in &config.enabled_providers {
            let Some(credentials) = config.credentials.get(kind) else {
                warn!(provider = %kind, "Provider enabled without credentials, skipping");
                continue;
            };

            let provider: Arc<dyn AIProvider> = match kind {
                ProviderKind::Gemini => {
                    let mut provider = GeminiProvider::new(&credentials.api_key);
                    if let Some(url) = &credentials.base_url {
                        provider = provider.with_base_url(url);
                    }
                    Arc::new(provider)
                }
                ProviderKind::OpenAI => {
                    let mut provider = OpenAIProvider::new(&credentials.api_key);
                    if let Some(url) = &credentials.base_url {
                        provider = provider.with_base_url(url);
                    }
                    Arc::new(provider)
                }
            };

            debug!(provider = %kind, "Registered AI provider");
            registry.register(*kind, provider);
        }

        registry
    }

    /// Register (or replace) the provider serving `kind`.
    pub fn register(&mut self, kind: ProviderKind, provider: Arc<dyn AIProvider>) {
        self.providers.insert(kind, provider);
    }

    /// Get a provider by kind.
    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn AIProvider>> {
        self.providers.get(&kind).cloned()
    }

    /// Check if a provider is registered.
    pub fn has_provider(&self, kind: ProviderKind) -> bool {
        self.providers.contains_key(&kind)
    }

    /// Get the provider serving `model`, returning an error if it is not configured.
    pub fn require(&self, model: &ModelProvider) -> ComposerResult<Arc<dyn AIProvider>> {
        self.get(model.kind())
            .filter(|p| p.is_configured())
            .ok_or_else(|| ComposerError::ProviderNotConfigured {
                provider: model.kind().to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderCredentials;

    fn config_with(kinds: &[ProviderKind], credentialed: &[ProviderKind]) -> AiConfig {
        let mut config = AiConfig::default();
        config.enabled_providers.extend(kinds.iter().copied());
        for kind in credentialed {
            config.credentials.insert(
                *kind,
                ProviderCredentials {
                    api_key: "key".to_string(),
                    base_url: None,
                },
            );
        }
        config
    }

    #[test]
    fn test_registry_creation() {
        let registry = ProviderRegistry::new();
        assert!(!registry.has_provider(ProviderKind::Gemini));
    }

    #[test]
    fn test_from_config_registers_credentialed_providers() {
        let config = config_with(
            &[ProviderKind::Gemini, ProviderKind::OpenAI],
            &[ProviderKind::Gemini],
        );
        let registry = ProviderRegistry::from_config(&config);

        assert!(registry.has_provider(ProviderKind::Gemini));
        assert!(!registry.has_provider(ProviderKind::OpenAI));
    }

    #[test]
    fn test_disabled_provider_is_not_registered() {
        let config = config_with(&[], &[ProviderKind::OpenAI]);
        let registry = ProviderRegistry::from_config(&config);
        assert!(!registry.has_provider(ProviderKind::OpenAI));
    }

    #[test]
    fn test_require_missing_provider() {
        let registry = ProviderRegistry::new();
        let err = registry
            .require(&ModelProvider::OpenAI("gpt-4o".to_string()))
            .err()
            .unwrap();
        assert!(matches!(err, ComposerError::ProviderNotConfigured { .. }));
    }
}
