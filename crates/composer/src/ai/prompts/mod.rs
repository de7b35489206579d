//! Prompt template system for AI operations.
//!
//! This module provides:
//! - Handlebars-based prompt templates
//! - Pre-defined templates for placeholder batches and issue drafts

use handlebars::Handlebars;
use serde::Serialize;
use std::collections::HashMap;

use crate::errors::{ComposerError, ComposerResult};

mod draft_epic;
mod draft_stories;
mod expand_placeholders;

pub use draft_epic::DraftEpicContext;
pub use draft_stories::DraftStoriesContext;
pub use expand_placeholders::{BatchItemContext, ExpandPlaceholdersContext};

/// Template id of the placeholder batch prompt.
pub const EXPAND_PLACEHOLDERS: &str = "expand-placeholders";
/// Template id of the epic draft prompt.
pub const DRAFT_EPIC: &str = "draft-epic";
/// Template id of the story draft prompt.
pub const DRAFT_STORIES: &str = "draft-stories";

/// A prompt template with system and user messages.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// Template ID
    pub id: String,
    /// Description
    pub description: String,
    /// System prompt template
    pub system: String,
    /// User prompt template
    pub user: String,
}

impl PromptTemplate {
    /// Create a new prompt template.
    pub fn new(id: impl Into<String>, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            system: system.into(),
            user: user.into(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Render the template, returning `(system, user)`.
    pub fn render<T: Serialize>(&self, context: &T) -> ComposerResult<(String, String)> {
        let mut handlebars = create_handlebars();

        handlebars
            .register_template_string("system", &self.system)
            .map_err(|e| ComposerError::Internal {
                reason: format!("Invalid system template '{}': {e}", self.id),
            })?;

        handlebars
            .register_template_string("user", &self.user)
            .map_err(|e| ComposerError::Internal {
                reason: format!("Invalid user template '{}': {e}", self.id),
            })?;

        let system = handlebars
            .render("system", context)
            .map_err(|e| ComposerError::Internal {
                reason: format!("Failed to render system prompt '{}': {e}", self.id),
            })?;

        let user = handlebars
            .render("user", context)
            .map_err(|e| ComposerError::Internal {
                reason: format!("Failed to render user prompt '{}': {e}", self.id),
            })?;

        Ok((system, user))
    }
}

/// Create a Handlebars instance with custom helpers.
fn create_handlebars() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();

    // Prompts are plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    // Helper: {{{json value}}}
    handlebars.register_helper(
        "json",
        Box::new(
            |h: &handlebars::Helper,
             _: &Handlebars,
             _: &handlebars::Context,
             _: &mut handlebars::RenderContext,
             out: &mut dyn handlebars::Output| {
                if let Some(param) = h.param(0) {
                    let json = serde_json::to_string(param.value())
                        .unwrap_or_else(|_| "null".to_string());
                    out.write(&json)?;
                }
                Ok(())
            },
        ),
    );

    handlebars
}

/// Prompt manager for loading and rendering templates.
pub struct PromptManager {
    templates: HashMap<String, PromptTemplate>,
}

impl PromptManager {
    /// Create a new prompt manager with the built-in templates.
    pub fn new() -> Self {
        let mut manager = Self {
            templates: HashMap::new(),
        };

        manager.register(expand_placeholders::template());
        manager.register(draft_epic::template());
        manager.register(draft_stories::template());

        manager
    }

    /// Register a template, replacing any template with the same id.
    pub fn register(&mut self, template: PromptTemplate) {
        self.templates.insert(template.id.clone(), template);
    }

    /// Get a template by ID.
    pub fn get(&self, id: &str) -> Option<&PromptTemplate> {
        self.templates.get(id)
    }

    /// Render a template with context.
    pub fn render<T: Serialize>(&self, id: &str, context: &T) -> ComposerResult<(String, String)> {
        let template = self.get(id).ok_or_else(|| ComposerError::Internal {
            reason: format!("Prompt template '{id}' not found"),
        })?;
        template.render(context)
    }
}

impl Default for PromptManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_template_rendering_does_not_escape() {
        let template = PromptTemplate::new(
            "test",
            "You are a {{role}}",
            "{{#if notes}}Notes: {{/if}}{{prompt}}",
        );

        let context = json!({
            "role": "product owner",
            "notes": true,
            "prompt": "<b>Goal</b> & \"scope\""
        });

        let (system, user) = template.render(&context).unwrap();

        assert_eq!(system, "You are a product owner");
        assert_eq!(user, "Notes: <b>Goal</b> & \"scope\"");
    }

    #[test]
    fn test_json_helper() {
        let template = PromptTemplate::new("test", "System", "Value: {{{json value}}}");
        let (_, user) = template.render(&json!({"value": "a \"quoted\" line"})).unwrap();
        assert_eq!(user, r#"Value: "a \"quoted\" line""#);
    }

    #[test]
    fn test_prompt_manager_has_builtins() {
        let manager = PromptManager::new();
        assert!(manager.get(EXPAND_PLACEHOLDERS).is_some());
        assert!(manager.get(DRAFT_EPIC).is_some());
        assert!(manager.get(DRAFT_STORIES).is_some());
        assert!(manager.render("missing", &json!({})).is_err());
    }
}
