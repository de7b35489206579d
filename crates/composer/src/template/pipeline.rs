//! Template expansion entry point.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::ai::TokenUsage;
use crate::errors::ComposerResult;
use crate::store::CodeStore;

use super::compose::{BatchComposer, ComposedRequest};
use super::extract::{extract, Extraction};
use super::splice::{splice, SpliceInput};
use super::TemplateId;

/// Final text of one template, free of placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpandedDocument {
    pub owner: TemplateId,
    pub body: String,
}

/// Something that went wrong locally and was recovered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExpansionWarning {
    /// A tag without a prompt was kept as literal text.
    MalformedTag { owner: TemplateId, offset: usize },
    /// The model returned a different number of items than requested.
    CountMismatch { expected: usize, received: usize },
    /// A fragment was cut to its placeholder's line cap.
    Truncated {
        owner: TemplateId,
        ordinal: usize,
        generated_lines: usize,
        max_lines: u32,
    },
}

/// Result of one generation cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Expansion {
    /// One document per input template, in input order
    pub documents: Vec<ExpandedDocument>,
    /// Token usage of the batch call, if one was made
    pub usage: Option<TokenUsage>,
    pub warnings: Vec<ExpansionWarning>,
}

impl Expansion {
    /// Body of the first document owned by `owner`.
    pub fn document(&self, owner: &str) -> Option<&str> {
        self.documents
            .iter()
            .find(|d| d.owner.as_str() == owner)
            .map(|d| d.body.as_str())
    }

    /// Documents keyed by owner.
    pub fn into_map(self) -> BTreeMap<TemplateId, String> {
        self.documents
            .into_iter()
            .map(|d| (d.owner, d.body))
            .collect()
    }
}

/// Expands sets of templates with at most one completion call per cycle.
pub struct TemplateExpander {
    composer: BatchComposer,
}

impl TemplateExpander {
    pub fn new(composer: BatchComposer) -> Self {
        Self { composer }
    }

    pub fn composer(&self) -> &BatchComposer {
        &self.composer
    }

    /// Expand every template against one shared context.
    ///
    /// With a blank context no completion call is made and every tag is
    /// removed. Otherwise all placeholders of all templates go out in a
    /// single call. Only AI failures abort the expansion.
    #[instrument(skip_all, fields(context_len = global_context.len()))]
    pub async fn expand_templates<I, K, V>(
        &self,
        global_context: &str,
        templates: I,
    ) -> ComposerResult<Expansion>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<TemplateId>,
        V: AsRef<str>,
    {
        let mut expansion = Expansion::default();

        let extracted: Vec<(TemplateId, Extraction)> = templates
            .into_iter()
            .map(|(owner, template)| {
                let owner = owner.into();
                let extraction = extract(&owner, template.as_ref());
                (owner, extraction)
            })
            .collect();

        for (owner, extraction) in &extracted {
            expansion
                .warnings
                .extend(extraction.malformed.iter().map(|offset| {
                    ExpansionWarning::MalformedTag {
                        owner: owner.clone(),
                        offset: *offset,
                    }
                }));
        }

        let request = self.composer.compose(
            global_context,
            extracted.iter().map(|(_, e)| e.placeholders.as_slice()),
        );

        let result = match request {
            ComposedRequest::Empty => None,
            ComposedRequest::Batch(request) => {
                let result = self.composer.generate(&request).await?;
                if result.returned != request.items.len() {
                    warn!(
                        expected = request.items.len(),
                        received = result.returned,
                        "AI returned a different number of items than requested"
                    );
                    expansion.warnings.push(ExpansionWarning::CountMismatch {
                        expected: request.items.len(),
                        received: result.returned,
                    });
                }
                expansion.usage = Some(result.usage);
                Some(result)
            }
        };

        let mut offset = 0;
        for (owner, extraction) in extracted {
            let count = extraction.placeholders.len();
            let input = match &result {
                None => SpliceInput::Empty,
                Some(result) => {
                    let len = result.items.len();
                    SpliceInput::Generated(&result.items[offset.min(len)..(offset + count).min(len)])
                }
            };
            offset += count;

            let document = splice(&extraction.skeleton, &extraction.placeholders, input);
            expansion
                .warnings
                .extend(document.truncated.into_iter().map(|t| ExpansionWarning::Truncated {
                    owner: owner.clone(),
                    ordinal: t.ordinal,
                    generated_lines: t.generated_lines,
                    max_lines: t.max_lines,
                }));
            expansion.documents.push(ExpandedDocument {
                owner,
                body: document.body,
            });
        }

        info!(
            documents = expansion.documents.len(),
            generated = expansion.usage.is_some(),
            warnings = expansion.warnings.len(),
            "Templates expanded"
        );

        Ok(expansion)
    }

    /// Expand the templates of stored codes, in the given order.
    pub async fn expand_codes(
        &self,
        store: &dyn CodeStore,
        global_context: &str,
        codes: &[&str],
    ) -> ComposerResult<Expansion> {
        let mut templates = Vec::with_capacity(codes.len());
        for code in codes {
            let record = store.require(code).await?;
            templates.push((record.template_id(), record.template));
        }
        self.expand_templates(global_context, templates).await
    }
}
