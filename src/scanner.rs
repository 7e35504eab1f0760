use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Match, Regex};

use crate::types::{Reference, ReferenceKind};

/// All three reference syntaxes in one alternation, so a single left-to-right
/// pass claims each byte range at most once. A definition is anchored to line
/// start and tried first; an inline match swallows its leading `!` when present,
/// which is what keeps an image from also matching as a link.
#[allow(clippy::expect_used, reason = "hardcoded pattern, compile-time invariant")]
static REFERENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(concat!(
        r"(?m)^[ \t]*\[(?P<label>[^\]\r\n]+)\]:[ \t]*(?P<definition>\S+)",
        r"|(?P<bang>!?)\[(?P<text>[^\[\]\r\n]*)\]\((?P<target>[^)\r\n]+)\)",
    ))
    .expect("valid regex");
});

/// Build a reference from one inline `[text](target)` or `![alt](target)` match.
/// Returns `None` for links with no display text or an empty target.
fn inline_reference(cap: &Captures<'_>, whole: Match<'_>, line: usize) -> Option<Reference> {
    let text = cap.name("text")?;
    let target = cap.name("target")?;
    let is_image = cap.name("bang").is_some_and(|m| return !m.is_empty());

    if !is_image && text.as_str().trim().is_empty() {
        return None;
    }

    let extent = target_extent(target.as_str())?;
    let target_span = shift(&extent, target.start())?;
    let raw = target.as_str().get(extent)?;

    return Some(Reference {
        kind: if is_image { ReferenceKind::Image } else { ReferenceKind::Link },
        label: text.as_str().to_string(),
        line,
        span: whole.range(),
        target: raw.to_string(),
        target_span,
    });
}

/// Extract every link-like reference from markdown text, in source order.
/// Spans of the returned references never overlap.
pub fn extract_references(content: &str) -> Vec<Reference> {
    let mut references = Vec::new();
    let mut line = 1_usize;
    let mut counted_to = 0_usize;

    for cap in REFERENCE_PATTERN.captures_iter(content) {
        let Some(whole) = cap.get(0) else { continue };
        let skipped = content.get(counted_to..whole.start()).unwrap_or("");
        line = line.saturating_add(skipped.matches('\n').count());
        counted_to = whole.start();

        let reference = if cap.name("definition").is_some() {
            reference_definition(&cap, whole, line)
        } else {
            inline_reference(&cap, whole, line)
        };
        if let Some(reference) = reference {
            references.push(reference);
        }
    }

    return references;
}

/// Build a reference from a `[label]: target` line.
fn reference_definition(cap: &Captures<'_>, whole: Match<'_>, line: usize) -> Option<Reference> {
    let label = cap.name("label")?;
    let target = cap.name("definition")?;

    return Some(Reference {
        kind: ReferenceKind::ReferenceDefinition,
        label: label.as_str().to_string(),
        line,
        span: whole.range(),
        target: target.as_str().to_string(),
        target_span: target.range(),
    });
}

/// Offset a range relative to a match into a range over the whole text.
fn shift(range: &Range<usize>, by: usize) -> Option<Range<usize>> {
    return Some(range.start.checked_add(by)?..range.end.checked_add(by)?);
}

/// Locate the target inside the parenthesized part of an inline link,
/// dropping surrounding whitespace and a trailing `"title"` or `'title'`.
fn target_extent(inner: &str) -> Option<Range<usize>> {
    let start = inner.len().saturating_sub(inner.trim_start().len());
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        return None;
    }

    let title_start = trimmed
        .char_indices()
        .zip(trimmed.char_indices().skip(1))
        .find(|((_, c), (_, next))| {
            return c.is_whitespace() && matches!(*next, '"' | '\'');
        })
        .map(|((idx, _), _)| return idx);

    let len = match title_start {
        Some(idx) => trimmed.get(..idx)?.trim_end().len(),
        None => trimmed.len(),
    };
    return Some(start..start.checked_add(len)?);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_is_one_reference_not_two() {
        let refs = extract_references("See ![alt](img.png) here.");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, ReferenceKind::Image);
        assert_eq!(refs[0].target, "img.png");
        assert_eq!(refs[0].label, "alt");
    }

    #[test]
    fn mixed_forms_in_source_order() {
        let text = "# Title\n\n[one](a.md) and ![](b.png)\n  [ref]: ./c.md \"Title\"\n";
        let refs = extract_references(text);
        let kinds: Vec<ReferenceKind> = refs.iter().map(|r| return r.kind).collect();
        assert_eq!(
            kinds,
            vec![ReferenceKind::Link, ReferenceKind::Image, ReferenceKind::ReferenceDefinition]
        );
        assert_eq!(refs[2].target, "./c.md");
        assert_eq!(refs[2].label, "ref");
        assert_eq!(refs.iter().map(|r| return r.line).collect::<Vec<_>>(), vec![3, 3, 4]);
    }

    #[test]
    fn spans_never_overlap() {
        let text = "![a](x.png)[b](y.md)\n[c]: z.md\n![d](w.png) [e](v.md#s)";
        let refs = extract_references(text);
        assert_eq!(refs.len(), 5);
        for pair in refs.windows(2) {
            assert!(pair[0].span.end <= pair[1].span.start);
        }
    }

    #[test]
    fn target_span_points_at_target() {
        let text = "x [t]( sub/page.md#intro \"Page\") y";
        let refs = extract_references(text);
        assert_eq!(refs.len(), 1);
        assert_eq!(&text[refs[0].target_span.clone()], "sub/page.md#intro");
        assert_eq!(refs[0].fragment(), Some("#intro"));
    }

    #[test]
    fn definition_only_at_line_start() {
        let refs = extract_references("text [label]: not-a-definition.md\n");
        assert!(refs.is_empty());
    }

    #[test]
    fn badge_inside_link_yields_the_image() {
        let refs = extract_references("[![build](badge.svg)](https://ci.example.com)");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, ReferenceKind::Image);
        assert_eq!(refs[0].target, "badge.svg");
    }

    #[test]
    fn empty_link_text_is_ignored() {
        assert!(extract_references("[](nowhere.md)").is_empty());
    }

    #[test]
    fn crlf_line_numbers() {
        let refs = extract_references("a\r\nb\r\n[x](y.md)\r\n");
        assert_eq!(refs[0].line, 3);
        assert_eq!(refs[0].target, "y.md");
    }
}
