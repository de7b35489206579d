//! Tag extraction.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use super::{Placeholder, Skeleton, TemplateId, DEFAULT_MAX_LINES};

/// A whole tag: `<AI`, zero or more `name="value"` attributes, then `/>` or `>`.
/// Quoted values may contain `>` and `\"`.
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<AI((?:\s+[A-Za-z_][A-Za-z0-9_-]*\s*=\s*"(?:[^"\\]|\\.)*")*)\s*/?>"#)
        .expect("tag pattern is valid")
});

static ATTRIBUTE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][A-Za-z0-9_-]*)\s*=\s*"((?:[^"\\]|\\.)*)""#)
        .expect("attribute pattern is valid")
});

/// Result of scanning one template.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// The template with every valid tag replaced by a marker
    pub skeleton: Skeleton,
    /// Valid tags, in document order
    pub placeholders: Vec<Placeholder>,
    /// Byte offsets of tags left as literal text because they lack a prompt
    pub malformed: Vec<usize>,
}

/// Scan `template` for `<AI/>` tags.
///
/// Never fails: a tag without a `prompt` and an unterminated tag both stay in
/// the skeleton as literal text.
pub fn extract(owner: &TemplateId, template: &str) -> Extraction {
    let mut extraction = Extraction::default();
    let mut cursor = 0;

    for tag in TAG_PATTERN.captures_iter(template) {
        let Some(whole) = tag.get(0) else { continue };
        let attributes = tag.get(1).map_or("", |m| m.as_str());

        let Some(parsed) = parse_attributes(attributes) else {
            warn!(
                owner = %owner,
                offset = whole.start(),
                "AI tag without a prompt left as literal text"
            );
            extraction.malformed.push(whole.start());
            continue;
        };

        let ordinal = extraction.placeholders.len();
        extraction
            .skeleton
            .push_literal(&template[cursor..whole.start()]);
        extraction.skeleton.push_marker(ordinal);
        extraction.placeholders.push(Placeholder {
            owner: owner.clone(),
            ordinal,
            span: whole.range(),
            prompt: parsed.prompt,
            system: parsed.system,
            max_lines: parsed.max_lines,
        });
        cursor = whole.end();
    }

    extraction.skeleton.push_literal(&template[cursor..]);

    debug!(
        owner = %owner,
        placeholders = extraction.placeholders.len(),
        malformed = extraction.malformed.len(),
        "Extracted AI placeholders"
    );

    extraction
}

struct TagAttributes {
    prompt: String,
    system: Option<String>,
    max_lines: u32,
}

/// Parse the attribute list of one tag. Returns `None` when there is no
/// non-empty `prompt`. The first occurrence of a repeated attribute wins.
fn parse_attributes(attributes: &str) -> Option<TagAttributes> {
    let mut prompt = None;
    let mut system = None;
    let mut max_lines = None;

    for attribute in ATTRIBUTE_PATTERN.captures_iter(attributes) {
        let (Some(name), Some(value)) = (attribute.get(1), attribute.get(2)) else {
            continue;
        };
        let slot = match name.as_str() {
            "prompt" => &mut prompt,
            "system" => &mut system,
            "maxLines" => &mut max_lines,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(unescape(value.as_str()));
        }
    }

    let prompt = prompt.filter(|p| !p.trim().is_empty())?;

    Some(TagAttributes {
        prompt,
        system: system.filter(|s| !s.trim().is_empty()),
        max_lines: max_lines
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_LINES),
    })
}

/// Decode `\"` and `\\`; any other backslash is kept as written.
fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next @ ('"' | '\\')) => out.push(next),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
