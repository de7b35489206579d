//! Template expansion pipeline.
//!
//! A template is Jira wiki markup with embedded placeholder tags:
//!
//! ```text
//! <AI prompt="<escaped string>" [system="<escaped string>"] [maxLines="<positive integer>"] />
//! ```
//!
//! Expansion runs in three stages:
//! - [`extract`] finds the tags of one template and returns its skeleton
//! - [`compose`] pools the placeholders of every template into at most one
//!   generation request
//! - [`splice`] writes the generated fragments back at the marker positions
//!
//! [`TemplateExpander`] ties the stages together.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

pub mod compose;
pub mod extract;
pub mod pipeline;
pub mod splice;

pub use compose::{
    compose, BatchComposer, ComposedRequest, GeneratedFragment, GenerationRequest,
    GenerationResult,
};
pub use extract::{extract, Extraction};
pub use pipeline::{ExpandedDocument, Expansion, ExpansionWarning, TemplateExpander};
pub use splice::{splice, SpliceInput, SplicedDocument, Truncation};

/// Line cap applied when a tag has no usable `maxLines`.
pub const DEFAULT_MAX_LINES: u32 = 5;

/// Identifies the record that owns a template (a project code or a task code).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TemplateId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TemplateId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&String> for TemplateId {
    fn from(id: &String) -> Self {
        Self(id.clone())
    }
}

/// One `<AI/>` tag parsed out of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    /// Template the tag belongs to
    pub owner: TemplateId,
    /// Document-order index within the owning template
    pub ordinal: usize,
    /// Byte range of the whole tag in the owning template
    pub span: Range<usize>,
    /// Instruction for the model
    pub prompt: String,
    /// Persona for the model
    pub system: Option<String>,
    /// Soft cap on generated lines, always at least 1
    pub max_lines: u32,
}

/// Piece of a skeleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Template bytes copied verbatim
    Literal(String),
    /// Position of the placeholder with this ordinal
    Marker(usize),
}

/// A template with its placeholders replaced by position markers.
///
/// Markers are structural, so literal text can never be mistaken for one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Skeleton {
    segments: Vec<Segment>,
}

/// Opens a marker in [`Skeleton::marked`] (Unicode private use area).
pub const MARKER_OPEN: char = '\u{E000}';
/// Closes a marker in [`Skeleton::marked`].
pub const MARKER_CLOSE: char = '\u{E001}';
/// Stands in for the `<` of a literal `<AI` in [`Skeleton::marked`].
pub const LITERAL_TAG_OPEN: char = '\u{E002}';

impl Skeleton {
    pub(crate) fn push_literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Literal(last)) = self.segments.last_mut() {
            last.push_str(text);
        } else {
            self.segments.push(Segment::Literal(text.to_string()));
        }
    }

    pub(crate) fn push_marker(&mut self, ordinal: usize) {
        self.segments.push(Segment::Marker(ordinal));
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of markers in the skeleton.
    pub fn marker_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Marker(_)))
            .count()
    }

    /// Literal pieces, in order.
    pub fn literals(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Literal(text) => Some(text.as_str()),
            Segment::Marker(_) => None,
        })
    }

    /// Text form for diagnostics: each marker is written as
    /// `U+E000 <ordinal> U+E001` and every literal `<AI` as `U+E002 AI`,
    /// so extracting the result again never finds a tag.
    pub fn marked(&self) -> String {
        let escaped = format!("{LITERAL_TAG_OPEN}AI");
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(&text.replace("<AI", &escaped)),
                Segment::Marker(ordinal) => {
                    out.push(MARKER_OPEN);
                    out.push_str(&ordinal.to_string());
                    out.push(MARKER_CLOSE);
                }
            }
        }
        out
    }
}
