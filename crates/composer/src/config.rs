//! Composer configuration.
//!
//! Settings come from an optional `.composer/config.json` under the project
//! root, then environment variables override what the file says:
//!
//! - `GEMINI_API_KEY` (or `GOOGLE_API_KEY`): enables the Gemini provider
//! - `OPENAI_API_KEY`: enables the OpenAI provider
//! - `COMPOSER_MODEL`: model as `provider:model`, e.g. `gemini:gemini-2.0-flash`
//! - `COMPOSER_AI_TIMEOUT_SECS`: timeout for a single completion call
//! - `JIRA_BASE_URL`, `JIRA_EMAIL`, `JIRA_API_TOKEN`: Jira credentials

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::ai::{ModelProvider, ProviderKind};
use crate::errors::{ComposerError, ComposerResult};

/// Directory holding composer state inside a project
pub const COMPOSER_DIR: &str = ".composer";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComposerConfig {
    /// AI completion settings
    #[serde(default)]
    pub ai: AiConfig,

    /// Jira connection, if configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jira: Option<JiraConfig>,
}

/// AI provider settings handed to the batch composer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    /// Providers allowed to serve requests
    #[serde(default)]
    pub enabled_providers: BTreeSet<ProviderKind>,

    /// Credentials per provider
    #[serde(default)]
    pub credentials: BTreeMap<ProviderKind, ProviderCredentials>,

    /// Model to use; defaults from the enabled providers when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelProvider>,

    /// Timeout for one completion call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

/// API credentials for one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    pub api_key: String,

    /// Optional API root override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Jira connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraConfig {
    /// Instance URL, e.g. `https://your-domain.atlassian.net`
    pub base_url: String,
    /// Account email used for basic auth
    pub email: String,
    /// API token used for basic auth
    pub api_token: String,
}

const fn default_timeout_secs() -> u64 {
    60
}

const fn default_temperature() -> f32 {
    0.7
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled_providers: BTreeSet::new(),
            credentials: BTreeMap::new(),
            model: None,
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
        }
    }
}

impl AiConfig {
    /// The model to use: the configured one, else Gemini's default when
    /// Gemini is enabled, else OpenAI's.
    pub fn resolved_model(&self) -> ModelProvider {
        if let Some(model) = &self.model {
            return model.clone();
        }
        if self.enabled_providers.contains(&ProviderKind::Gemini)
            || !self.enabled_providers.contains(&ProviderKind::OpenAI)
        {
            ProviderKind::Gemini.default_model()
        } else {
            ProviderKind::OpenAI.default_model()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn enable(&mut self, kind: ProviderKind, api_key: String) {
        let base_url = self
            .credentials
            .get(&kind)
            .and_then(|c| c.base_url.clone());
        self.credentials
            .insert(kind, ProviderCredentials { api_key, base_url });
        self.enabled_providers.insert(kind);
    }
}

impl ComposerConfig {
    /// Path of the config file inside a project.
    pub fn path(project_root: impl AsRef<Path>) -> PathBuf {
        project_root.as_ref().join(COMPOSER_DIR).join("config.json")
    }

    /// Load the config file (if any) and apply environment overrides.
    pub async fn load(project_root: impl AsRef<Path>) -> ComposerResult<Self> {
        let mut config = Self::load_file(Self::path(project_root)).await?;
        config.apply_vars(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Read a config file; a missing file yields the defaults.
    pub async fn load_file(path: impl AsRef<Path>) -> ComposerResult<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| ComposerError::ConfigError {
                reason: format!("{}: {e}", path.display()),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ComposerError::FileReadError {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Save the configuration to a file.
    pub async fn save(&self, path: impl AsRef<Path>) -> ComposerResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .await
            .map_err(|e| ComposerError::FileWriteError {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production, a map in tests).
    pub fn apply_vars<F>(&mut self, lookup: F) -> ComposerResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = var("GEMINI_API_KEY").or_else(|| var("GOOGLE_API_KEY")) {
            self.ai.enable(ProviderKind::Gemini, key);
        }
        if let Some(key) = var("OPENAI_API_KEY") {
            self.ai.enable(ProviderKind::OpenAI, key);
        }
        if let Some(model) = var("COMPOSER_MODEL") {
            self.ai.model = Some(model.parse()?);
        }
        if let Some(timeout) = var("COMPOSER_AI_TIMEOUT_SECS") {
            self.ai.timeout_secs = timeout
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ComposerError::InvalidConfigValue {
                    key: "COMPOSER_AI_TIMEOUT_SECS".to_string(),
                    reason: format!("'{timeout}' is not a positive number of seconds"),
                })?;
        }

        if let (Some(base_url), Some(email), Some(api_token)) =
            (var("JIRA_BASE_URL"), var("JIRA_EMAIL"), var("JIRA_API_TOKEN"))
        {
            self.jira = Some(JiraConfig {
                base_url,
                email,
                api_token,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ComposerConfig::default();
        assert!(config.ai.enabled_providers.is_empty());
        assert_eq!(config.ai.timeout_secs, 60);
        assert!(config.jira.is_none());
    }

    #[test]
    fn test_env_enables_providers() {
        let mut config = ComposerConfig::default();
        config
            .apply_vars(lookup(&[("OPENAI_API_KEY", "sk-1"), ("GOOGLE_API_KEY", "g-1")]))
            .unwrap();

        assert!(config.ai.enabled_providers.contains(&ProviderKind::OpenAI));
        assert!(config.ai.enabled_providers.contains(&ProviderKind::Gemini));
        assert_eq!(config.ai.credentials[&ProviderKind::Gemini].api_key, "g-1");
        assert_eq!(
            config.ai.resolved_model(),
            ModelProvider::Gemini("gemini-2.0-flash".to_string())
        );
    }

    #[test]
    fn test_openai_only_defaults_to_openai_model() {
        let mut config = ComposerConfig::default();
        config.apply_vars(lookup(&[("OPENAI_API_KEY", "sk-1")])).unwrap();
        assert_eq!(config.ai.resolved_model().kind(), ProviderKind::OpenAI);
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        let mut config = ComposerConfig::default();
        let err = config
            .apply_vars(lookup(&[("COMPOSER_AI_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ComposerError::InvalidConfigValue { .. }));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut config = ComposerConfig::default();
        let err = config
            .apply_vars(lookup(&[("COMPOSER_AI_TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ComposerError::InvalidConfigValue { ref key, .. } if key == "COMPOSER_AI_TIMEOUT_SECS"
        ));
        assert_eq!(config.ai.timeout_secs, 60);

        config
            .apply_vars(lookup(&[("COMPOSER_AI_TIMEOUT_SECS", " 5 ")]))
            .unwrap();
        assert_eq!(config.ai.timeout_secs, 5);
    }

    #[test]
    fn test_jira_requires_all_three_vars() {
        let mut config = ComposerConfig::default();
        config
            .apply_vars(lookup(&[("JIRA_BASE_URL", "https://x.atlassian.net")]))
            .unwrap();
        assert!(config.jira.is_none());

        config
            .apply_vars(lookup(&[
                ("JIRA_BASE_URL", "https://x.atlassian.net"),
                ("JIRA_EMAIL", "me@example.com"),
                ("JIRA_API_TOKEN", "t"),
            ]))
            .unwrap();
        assert_eq!(config.jira.unwrap().email, "me@example.com");
    }

    #[tokio::test]
    async fn test_file_round_trip_keeps_base_url_on_env_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = ComposerConfig::path(dir.path());

        let mut config = ComposerConfig::default();
        config.ai.credentials.insert(
            ProviderKind::OpenAI,
            ProviderCredentials {
                api_key: "old".to_string(),
                base_url: Some("https://proxy.internal/v1".to_string()),
            },
        );
        config.save(&path).await.unwrap();

        let mut loaded = ComposerConfig::load_file(&path).await.unwrap();
        loaded.apply_vars(lookup(&[("OPENAI_API_KEY", "new")])).unwrap();

        let creds = &loaded.ai.credentials[&ProviderKind::OpenAI];
        assert_eq!(creds.api_key, "new");
        assert_eq!(creds.base_url.as_deref(), Some("https://proxy.internal/v1"));
    }

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ComposerConfig::load_file(dir.path().join("nope.json"))
            .await
            .unwrap();
        assert!(config.ai.model.is_none());
    }

    #[tokio::test]
    async fn test_broken_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let err = ComposerConfig::load_file(&path).await.unwrap_err();
        assert!(matches!(err, ComposerError::ConfigError { .. }));
    }
}
