//! Placeholder batch prompt template.
//!
//! One request carries every `<AI/>` placeholder of a generation cycle. The
//! model answers with a JSON list holding one entry per numbered item.

use serde::Serialize;

use super::{PromptTemplate, EXPAND_PLACEHOLDERS};

/// One numbered item of the batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItemContext {
    /// 1-based item number, echoed back by the model as `index`
    pub number: usize,
    /// Instruction from the tag's `prompt` attribute
    pub prompt: String,
    /// Persona from the tag's `system` attribute
    pub system: Option<String>,
    /// Line limit from the tag's `maxLines` attribute
    pub max_lines: u32,
}

/// Context for the expand-placeholders prompt.
#[derive(Debug, Clone, Serialize)]
pub struct ExpandPlaceholdersContext {
    /// Free-form notes supplied by the user
    pub global_context: String,
    /// Number of items the answer must contain
    pub item_count: usize,
    pub items: Vec<BatchItemContext>,
}

/// Get the expand-placeholders template.
pub fn template() -> PromptTemplate {
    PromptTemplate::new(EXPAND_PLACEHOLDERS, SYSTEM_PROMPT, USER_PROMPT)
        .with_description("Fill every AI placeholder of a set of Jira templates in one call")
}

const SYSTEM_PROMPT: &str = r#"You write sections of Jira issue descriptions in Jira wiki markup.
You receive shared context notes and a numbered list of items. Produce exactly one answer per numbered item, in the same order.

Rules:
- Answer every item, even when the notes say little about it; never merge or skip items.
- When an item has a persona, write that answer in that persona.
- Never exceed an item's line limit. Count every line break.
- Output only the text of each answer: no headings repeating the instruction, no item numbers inside the text.
- Respond with strictly valid JSON and nothing else, in this shape:
  {"items": [{"index": 1, "text": "..."}, {"index": 2, "text": "..."}]}
- The "items" array must contain exactly {{item_count}} entries, with "index" running from 1 to {{item_count}}."#;

const USER_PROMPT: &str = r#"Context notes:
"""
{{global_context}}
"""

Items ({{item_count}}):
{{#each items}}
{{number}}. Instruction: {{prompt}}
{{#if system}}   Persona: {{system}}
{{/if}}   Line limit: {{max_lines}}
{{/each}}

Return the JSON object with exactly {{item_count}} answers."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_numbers_items_and_limits() {
        let context = ExpandPlaceholdersContext {
            global_context: "Checkout revamp".to_string(),
            item_count: 2,
            items: vec![
                BatchItemContext {
                    number: 1,
                    prompt: "state the goal".to_string(),
                    system: None,
                    max_lines: 2,
                },
                BatchItemContext {
                    number: 2,
                    prompt: "list risks".to_string(),
                    system: Some("a QA lead".to_string()),
                    max_lines: 5,
                },
            ],
        };

        let (system, user) = template().render(&context).unwrap();

        assert!(system.contains("exactly 2 entries"));
        assert!(user.contains("Checkout revamp"));
        assert!(user.contains("1. Instruction: state the goal"));
        assert!(user.contains("Line limit: 2"));
        assert!(user.contains("2. Instruction: list risks"));
        assert!(user.contains("Persona: a QA lead"));
        assert_eq!(user.matches("Persona:").count(), 1);
    }
}
