//! Drafts from free-form notes.
//!
//! Epic and story drafting are independent requests, so [`DraftDomain::draft_all`]
//! runs them concurrently. Neither touches the placeholder batch.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::ai::prompts::{DraftEpicContext, DraftStoriesContext, DRAFT_EPIC, DRAFT_STORIES};
use crate::ai::{parse_ai_response, AIMessage, TokenUsage};
use crate::errors::{ComposerError, ComposerResult};
use crate::template::BatchComposer;

const EPIC_MAX_TOKENS: u32 = 4000;
const STORIES_MAX_TOKENS: u32 = 8000;

/// A drafted epic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpicDraft {
    pub summary: String,
    #[serde(default)]
    pub description: String,
}

/// A drafted user story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryDraft {
    pub summary: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct StoriesResponse {
    #[serde(default)]
    stories: Vec<StoryDraft>,
}

/// Epic plus stories drafted from the same notes.
#[derive(Debug, Clone, Serialize)]
pub struct Drafts {
    pub epic: EpicDraft,
    pub stories: Vec<StoryDraft>,
    pub usage: TokenUsage,
}

/// AI drafting of epics and stories.
pub struct DraftDomain<'a> {
    composer: &'a BatchComposer,
}

impl<'a> DraftDomain<'a> {
    pub fn new(composer: &'a BatchComposer) -> Self {
        Self { composer }
    }

    fn validate(notes: &str) -> ComposerResult<()> {
        if notes.trim().is_empty() {
            return Err(ComposerError::InvalidArgument {
                reason: "notes are empty".to_string(),
            });
        }
        Ok(())
    }

    /// Draft one epic from notes.
    #[instrument(skip_all)]
    pub async fn draft_epic(&self, notes: &str) -> ComposerResult<(EpicDraft, TokenUsage)> {
        Self::validate(notes)?;
        let (system, user) = self.composer.prompts().render(
            DRAFT_EPIC,
            &DraftEpicContext {
                notes: notes.to_string(),
            },
        )?;

        let response = self
            .composer
            .complete(
                &[AIMessage::system(system), AIMessage::user(user)],
                EPIC_MAX_TOKENS,
            )
            .await?;
        let epic: EpicDraft = parse_ai_response(&response)?;
        Ok((epic, response.usage))
    }

    /// Draft user stories from notes; `max_stories` of 0 leaves the count to the model.
    #[instrument(skip(self, notes))]
    pub async fn draft_stories(
        &self,
        notes: &str,
        max_stories: usize,
    ) -> ComposerResult<(Vec<StoryDraft>, TokenUsage)> {
        Self::validate(notes)?;
        let (system, user) = self.composer.prompts().render(
            DRAFT_STORIES,
            &DraftStoriesContext {
                notes: notes.to_string(),
                max_stories,
            },
        )?;

        let response = self
            .composer
            .complete(
                &[AIMessage::system(system), AIMessage::user(user)],
                STORIES_MAX_TOKENS,
            )
            .await?;
        let parsed: StoriesResponse = parse_ai_response(&response)?;

        let mut stories = parsed.stories;
        if max_stories > 0 {
            stories.truncate(max_stories);
        }
        Ok((stories, response.usage))
    }

    /// Draft the epic and the stories concurrently.
    pub async fn draft_all(&self, notes: &str, max_stories: usize) -> ComposerResult<Drafts> {
        let ((epic, epic_usage), (stories, story_usage)) = futures::try_join!(
            self.draft_epic(notes),
            self.draft_stories(notes, max_stories)
        )?;

        Ok(Drafts {
            epic,
            stories,
            usage: epic_usage + story_usage,
        })
    }
}
