//! Epic draft prompt template.

use serde::Serialize;

use super::{PromptTemplate, DRAFT_EPIC};

/// Context for the draft-epic prompt.
#[derive(Debug, Clone, Serialize)]
pub struct DraftEpicContext {
    /// Free-form notes to turn into an epic
    pub notes: String,
}

/// Get the draft-epic template.
pub fn template() -> PromptTemplate {
    PromptTemplate::new(DRAFT_EPIC, SYSTEM_PROMPT, USER_PROMPT)
        .with_description("Turn free-form notes into a Jira epic")
}

const SYSTEM_PROMPT: &str = r#"You are an experienced product owner writing Jira epics.
Write the description in Jira wiki markup (h2. headings, * bullets, *bold*).
Respond with strictly valid JSON and nothing else:
{"summary": "<one line, at most 120 characters>", "description": "<wiki markup>"}"#;

const USER_PROMPT: &str = r#"Write one epic for these notes:
"""
{{notes}}
"""
The description should cover the goal, the scope and the acceptance criteria."#;
