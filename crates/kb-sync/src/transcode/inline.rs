//! Inline span rendering and parsing.
//!
//! Annotations are always applied in the same order, innermost first:
//! bold, italic, inline code, strikethrough, link. A span that is bold and
//! linked therefore renders as `[**text**](href)` no matter how the remote
//! side ordered its annotation flags. The parser undoes exactly this nesting.

use crate::blocks::{Annotations, RichText, Span};

/// Render spans to markdown.
pub fn render_spans(spans: &[Span]) -> String {
    spans.iter().map(render_span).collect()
}

fn render_span(span: &Span) -> String {
    if span.text.is_empty() {
        return String::new();
    }
    let a = &span.annotations;
    let mut text = span.text.clone();
    if a.bold {
        text = format!("**{text}**");
    }
    if a.italic {
        text = format!("*{text}*");
    }
    if a.code {
        text = format!("`{text}`");
    }
    if a.strikethrough {
        text = format!("~~{text}~~");
    }
    if let Some(href) = &a.link {
        text = format!("[{text}]({href})");
    }
    text
}

/// Parse markdown inline syntax back into spans.
///
/// Unmatched markers are kept as literal text. Adjacent spans with identical
/// annotations are merged.
pub fn parse_spans(text: &str) -> RichText {
    let mut out = Vec::new();
    parse_into(text, &Annotations::default(), &mut out);
    out
}

/// Inline construct recognized at the start of the remaining input.
struct Marker<'a> {
    inner: &'a str,
    annotations: Annotations,
    consumed: usize,
    /// Inner text is literal (code spans without nested emphasis)
    literal: bool,
}

fn parse_into(text: &str, inherited: &Annotations, out: &mut RichText) {
    let mut plain = String::new();
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if let Some(marker) = match_marker(rest, inherited) {
            push_span(out, std::mem::take(&mut plain), inherited);
            if marker.literal {
                push_span(out, marker.inner.to_string(), &marker.annotations);
            } else {
                parse_into(marker.inner, &marker.annotations, out);
            }
            rest = &rest[marker.consumed..];
            continue;
        }
        plain.push(c);
        rest = &rest[c.len_utf8()..];
    }

    push_span(out, plain, inherited);
}

fn match_marker<'a>(rest: &'a str, inherited: &Annotations) -> Option<Marker<'a>> {
    if rest.starts_with('[') {
        return match_link(rest, inherited);
    }
    if let Some((inner, consumed)) = delimited(rest, "~~") {
        let annotations = Annotations {
            strikethrough: true,
            ..inherited.clone()
        };
        return Some(Marker {
            inner,
            annotations,
            consumed,
            literal: false,
        });
    }
    if let Some((inner, consumed)) = delimited(rest, "`") {
        let annotations = Annotations {
            code: true,
            ..inherited.clone()
        };
        // Emphasis nested inside code only ever comes from our own renderer
        let literal = !(inner.len() > 2 && inner.starts_with('*') && inner.ends_with('*'));
        return Some(Marker {
            inner,
            annotations,
            consumed,
            literal,
        });
    }
    for (delimiter, bold, italic) in [("***", true, true), ("**", true, false), ("*", false, true)] {
        if let Some((inner, consumed)) = delimited(rest, delimiter) {
            let annotations = Annotations {
                bold: inherited.bold || bold,
                italic: inherited.italic || italic,
                ..inherited.clone()
            };
            return Some(Marker {
                inner,
                annotations,
                consumed,
                literal: false,
            });
        }
    }
    None
}

/// `[inner](href)` at the start of `rest`.
fn match_link<'a>(rest: &'a str, inherited: &Annotations) -> Option<Marker<'a>> {
    let mid = rest.find("](")?;
    if rest[1..mid].contains(['[', ']']) {
        return None;
    }
    let href_start = mid + 2;
    let close = rest[href_start..].find(')')?;
    let href = &rest[href_start..href_start + close];
    if href.is_empty() || href.contains(char::is_whitespace) {
        return None;
    }
    Some(Marker {
        inner: &rest[1..mid],
        annotations: Annotations {
            link: Some(href.to_string()),
            ..inherited.clone()
        },
        consumed: href_start + close + 1,
        literal: false,
    })
}

/// Non-empty text wrapped in `delimiter` at the start of `rest`.
fn delimited<'a>(rest: &'a str, delimiter: &str) -> Option<(&'a str, usize)> {
    let after = rest.strip_prefix(delimiter)?;
    let end = after.find(delimiter)?;
    if end == 0 {
        return None;
    }
    Some((&after[..end], delimiter.len() * 2 + end))
}

fn push_span(out: &mut RichText, text: String, annotations: &Annotations) {
    if text.is_empty() {
        return;
    }
    if let Some(last) = out.last_mut() {
        if &last.annotations == annotations {
            last.text.push_str(&text);
            return;
        }
    }
    out.push(Span::with(text, annotations.clone()));
}
