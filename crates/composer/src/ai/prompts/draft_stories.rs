//! Story draft prompt template.

use serde::Serialize;

use super::{PromptTemplate, DRAFT_STORIES};

/// Context for the draft-stories prompt.
#[derive(Debug, Clone, Serialize)]
pub struct DraftStoriesContext {
    /// Free-form notes to split into stories
    pub notes: String,
    /// Upper bound on the number of stories (0 = let the model decide)
    pub max_stories: usize,
}

/// Get the draft-stories template.
pub fn template() -> PromptTemplate {
    PromptTemplate::new(DRAFT_STORIES, SYSTEM_PROMPT, USER_PROMPT)
        .with_description("Split free-form notes into Jira user stories")
}

const SYSTEM_PROMPT: &str = r#"You are an experienced product owner splitting work into Jira user stories.
Each story is independently deliverable and written as "As a <role>, I want <goal> so that <benefit>".
Descriptions use Jira wiki markup.
Respond with strictly valid JSON and nothing else:
{"stories": [{"summary": "<one line>", "description": "<wiki markup>"}]}"#;

const USER_PROMPT: &str = r#"Split these notes into user stories{{#if max_stories}} (at most {{max_stories}}){{/if}}:
"""
{{notes}}
"""
"#;
