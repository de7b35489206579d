//! Reinsertion of generated fragments into a skeleton.

use tracing::{debug, warn};

use super::{GeneratedFragment, Placeholder, Segment, Skeleton};

/// What to put at the markers of a skeleton.
#[derive(Debug, Clone, Copy)]
pub enum SpliceInput<'a> {
    /// No generation happened: every marker is removed.
    Empty,
    /// Fragments for this template's placeholders, in placeholder order.
    /// Missing trailing fragments are treated as empty.
    Generated(&'a [GeneratedFragment]),
}

/// A fragment cut down to its placeholder's line cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncation {
    pub ordinal: usize,
    pub generated_lines: usize,
    pub max_lines: u32,
}

/// Output of [`splice`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplicedDocument {
    pub body: String,
    pub truncated: Vec<Truncation>,
}

/// Rebuild a document from its skeleton.
///
/// Literal segments are copied unchanged. A fragment longer than its
/// placeholder's `max_lines` keeps only its first `max_lines` lines.
pub fn splice(
    skeleton: &Skeleton,
    placeholders: &[Placeholder],
    input: SpliceInput<'_>,
) -> SplicedDocument {
    let mut document = SplicedDocument::default();

    for segment in skeleton.segments() {
        match segment {
            Segment::Literal(text) => document.body.push_str(text),
            Segment::Marker(ordinal) => {
                let SpliceInput::Generated(fragments) = input else {
                    continue;
                };
                let Some(fragment) = fragments.get(*ordinal) else {
                    debug!(ordinal, "No fragment for placeholder, leaving it empty");
                    continue;
                };
                let max_lines = placeholders
                    .get(*ordinal)
                    .map_or(u32::MAX, |p| p.max_lines.max(1));

                match truncate_lines(&fragment.text, max_lines) {
                    Some((kept, generated_lines)) => {
                        warn!(
                            ordinal,
                            generated_lines, max_lines, "Generated text exceeds maxLines, truncating"
                        );
                        document.body.push_str(kept);
                        document.truncated.push(Truncation {
                            ordinal: *ordinal,
                            generated_lines,
                            max_lines,
                        });
                    }
                    None => document.body.push_str(&fragment.text),
                }
            }
        }
    }

    document
}

/// Returns the first `max_lines` lines of `text` and the original line
/// count, or `None` when `text` already fits.
fn truncate_lines(text: &str, max_lines: u32) -> Option<(&str, usize)> {
    let total = text.lines().count();
    let max = usize::try_from(max_lines).unwrap_or(usize::MAX);
    if total <= max {
        return None;
    }

    let cut = text
        .match_indices('\n')
        .nth(max.saturating_sub(1))
        .map_or(text.len(), |(index, _)| index);
    Some((text[..cut].trim_end_matches('\r'), total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{extract, TemplateId};

    fn fragments(texts: &[&str]) -> Vec<GeneratedFragment> {
        texts
            .iter()
            .map(|t| GeneratedFragment {
                text: (*t).to_string(),
            })
            .collect()
    }

    #[test]
    fn test_empty_input_removes_tags_only() {
        let template = "h2. Goal\n<AI prompt=\"state the goal\" maxLines=\"2\" />";
        let extraction = extract(&TemplateId::from("T"), template);

        let document = splice(
            &extraction.skeleton,
            &extraction.placeholders,
            SpliceInput::Empty,
        );

        assert_eq!(document.body, "h2. Goal\n");
        assert!(document.truncated.is_empty());
    }

    #[test]
    fn test_empty_input_keeps_surrounding_newlines() {
        let extraction = extract(&TemplateId::from("T"), "a\n<AI prompt=\"x\" />\nb");

        let document = splice(
            &extraction.skeleton,
            &extraction.placeholders,
            SpliceInput::Empty,
        );

        assert_eq!(document.body, "a\n\nb");
    }

    #[test]
    fn test_fragment_within_limit_is_unchanged() {
        let extraction = extract(&TemplateId::from("T"), "<AI prompt=\"x\" />");
        let generated = fragments(&["line1\nline2\nline3"]);

        let document = splice(
            &extraction.skeleton,
            &extraction.placeholders,
            SpliceInput::Generated(&generated),
        );

        assert_eq!(document.body, "line1\nline2\nline3");
    }

    #[test]
    fn test_fragment_over_limit_is_truncated() {
        let extraction = extract(
            &TemplateId::from("T"),
            "a\n<AI prompt=\"x\" maxLines=\"2\" />\nb",
        );
        let generated = fragments(&["one\r\ntwo\r\nthree\r\nfour"]);

        let document = splice(
            &extraction.skeleton,
            &extraction.placeholders,
            SpliceInput::Generated(&generated),
        );

        assert_eq!(document.body, "a\none\r\ntwo\nb");
        assert_eq!(
            document.truncated,
            vec![Truncation {
                ordinal: 0,
                generated_lines: 4,
                max_lines: 2
            }]
        );
    }

    #[test]
    fn test_missing_fragments_become_empty() {
        let extraction = extract(
            &TemplateId::from("T"),
            "[<AI prompt=\"a\" />][<AI prompt=\"b\" />][<AI prompt=\"c\" />]",
        );
        let generated = fragments(&["A"]);

        let document = splice(
            &extraction.skeleton,
            &extraction.placeholders,
            SpliceInput::Generated(&generated),
        );

        assert_eq!(document.body, "[A][][]");
    }

    #[test]
    fn test_literals_are_byte_identical() {
        let template = "  h3.  Odd   spacing \t\n\n<AI prompt=\"x\" />\r\n  trailing  ";
        let extraction = extract(&TemplateId::from("T"), template);
        let generated = fragments(&["X"]);

        let document = splice(
            &extraction.skeleton,
            &extraction.placeholders,
            SpliceInput::Generated(&generated),
        );

        assert_eq!(
            document.body,
            "  h3.  Odd   spacing \t\n\nX\r\n  trailing  "
        );
    }

    #[test]
    fn test_truncate_lines() {
        assert_eq!(truncate_lines("a\nb", 2), None);
        assert_eq!(truncate_lines("a\nb\n", 2), None);
        assert_eq!(truncate_lines("a\nb\nc", 1), Some(("a", 3)));
        assert_eq!(truncate_lines("", 1), None);
    }
}
