//! Markdown text → blocks.
//!
//! Line oriented: each line either starts a block of a recognizable kind or
//! continues the current paragraph. Blank lines end paragraphs and are
//! otherwise insignificant.

use super::inline::parse_spans;
use crate::blocks::{Block, MAX_BLOCKS_PER_REQUEST, Span};
use once_cell::sync::Lazy;
use regex::Regex;

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})(?:\s+(.*))?$").unwrap());
static TODO: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-*+] \[([ xX])\](?:\s(.*))?$").unwrap());
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-*+](?:\s+(.*))?$").unwrap());
static NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[.)](?:\s+(.*))?$").unwrap());
static CALLOUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^>\s?\[!([^\]]*)\]\s?(.*)$").unwrap());
static QUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^>\s?(.*)$").unwrap());
static DIVIDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:-{3,}|\*{3,}|_{3,})\s*$").unwrap());
static SUMMARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<summary>(.*)</summary>$").unwrap());

const FENCE: &str = "```";
const DETAILS_OPEN: &str = "<details>";
const DETAILS_CLOSE: &str = "</details>";

/// Parse markdown into blocks.
pub fn encode(text: &str) -> Vec<Block> {
    let lines: Vec<&str> = text.lines().collect();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim_end();

        if trimmed.trim().is_empty() {
            i += 1;
            continue;
        }

        if let Some(language) = trimmed.strip_prefix(FENCE) {
            let (code, next) = collect_fenced(&lines, i + 1);
            blocks.push(Block::Code {
                language: language.trim().to_string(),
                text: if code.is_empty() {
                    Vec::new()
                } else {
                    vec![Span::plain(code)]
                },
            });
            i = next;
            continue;
        }

        if trimmed == DETAILS_OPEN {
            let (summary, next) = collect_details(&lines, i + 1);
            blocks.push(Block::Toggle {
                text: parse_spans(&summary),
            });
            i = next;
            continue;
        }

        if DIVIDER.is_match(trimmed) {
            blocks.push(Block::Divider);
            i += 1;
            continue;
        }

        if let Some(caps) = HEADING.captures(trimmed) {
            let level = caps[1].len().min(3) as u8;
            blocks.push(Block::Heading {
                level,
                text: parse_spans(caps.get(2).map_or("", |m| m.as_str())),
            });
            i += 1;
            continue;
        }

        if let Some(caps) = TODO.captures(trimmed) {
            blocks.push(Block::Todo {
                checked: !caps[1].trim().is_empty(),
                text: parse_spans(caps.get(2).map_or("", |m| m.as_str())),
            });
            i += 1;
            continue;
        }

        if let Some(caps) = BULLET.captures(trimmed) {
            blocks.push(Block::BulletedItem {
                text: parse_spans(caps.get(1).map_or("", |m| m.as_str())),
            });
            i += 1;
            continue;
        }

        if let Some(caps) = NUMBERED.captures(trimmed) {
            blocks.push(Block::NumberedItem {
                text: parse_spans(caps.get(1).map_or("", |m| m.as_str())),
            });
            i += 1;
            continue;
        }

        if let Some(caps) = CALLOUT.captures(trimmed) {
            let icon = caps[1].to_string();
            let mut text = caps[2].to_string();
            i = collect_quoted(&lines, i + 1, &mut text);
            blocks.push(Block::Callout {
                icon,
                text: parse_spans(&text),
            });
            continue;
        }

        if let Some(caps) = QUOTE.captures(trimmed) {
            let mut text = caps[1].to_string();
            i = collect_quoted(&lines, i + 1, &mut text);
            blocks.push(Block::Quote {
                text: parse_spans(&text),
            });
            continue;
        }

        let mut paragraph = trimmed.to_string();
        i += 1;
        while i < lines.len() {
            let next = lines[i].trim_end();
            if next.trim().is_empty() || starts_block(next) {
                break;
            }
            paragraph.push('\n');
            paragraph.push_str(next);
            i += 1;
        }
        blocks.push(Block::Paragraph {
            text: parse_spans(&paragraph),
        });
    }

    blocks
}

/// Split blocks into request-sized batches.
pub fn batches(blocks: &[Block]) -> std::slice::Chunks<'_, Block> {
    blocks.chunks(MAX_BLOCKS_PER_REQUEST)
}

fn starts_block(line: &str) -> bool {
    line.starts_with(FENCE)
        || line == DETAILS_OPEN
        || DIVIDER.is_match(line)
        || HEADING.is_match(line)
        || BULLET.is_match(line)
        || NUMBERED.is_match(line)
        || QUOTE.is_match(line)
}

/// Code lines up to the closing fence. An unclosed fence runs to the end.
fn collect_fenced(lines: &[&str], start: usize) -> (String, usize) {
    let mut i = start;
    let mut code: Vec<&str> = Vec::new();
    while i < lines.len() {
        if lines[i].trim_end() == FENCE {
            return (code.join("\n"), i + 1);
        }
        code.push(lines[i]);
        i += 1;
    }
    (code.join("\n"), i)
}

/// Summary text of a `<details>` section. Nested content is dropped.
fn collect_details(lines: &[&str], start: usize) -> (String, usize) {
    let mut summary = String::new();
    let mut i = start;
    while i < lines.len() {
        let line = lines[i].trim();
        i += 1;
        if line == DETAILS_CLOSE {
            break;
        }
        if let Some(caps) = SUMMARY.captures(line) {
            if summary.is_empty() {
                summary = caps[1].to_string();
            }
        }
    }
    (summary, i)
}

/// Append continuation lines of a quote or callout, returning the next index.
fn collect_quoted(lines: &[&str], start: usize, text: &mut String) -> usize {
    let mut i = start;
    while i < lines.len() {
        let line = lines[i].trim_end();
        if CALLOUT.is_match(line) {
            break;
        }
        let Some(caps) = QUOTE.captures(line) else {
            break;
        };
        text.push('\n');
        text.push_str(&caps[1]);
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{Annotations, plain_text};
    use crate::transcode::decode;

    #[test]
    fn test_encode_basic_structure() {
        let text = "# Title\n\nFirst line\nsecond line\n\n- item\n1. numbered\n- [x] done\n";
        let blocks = encode(text);
        assert_eq!(
            blocks,
            vec![
                Block::heading(1, "Title"),
                Block::paragraph("First line\nsecond line"),
                Block::BulletedItem {
                    text: vec![Span::plain("item")]
                },
                Block::NumberedItem {
                    text: vec![Span::plain("numbered")]
                },
                Block::Todo {
                    checked: true,
                    text: vec![Span::plain("done")]
                },
            ]
        );
    }

    #[test]
    fn test_paragraph_stops_at_block_start() {
        let blocks = encode("Some text\n## Heading\n> quote");
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[1], Block::heading(2, "Heading"));
        assert!(matches!(blocks[2], Block::Quote { .. }));
    }

    #[test]
    fn test_deep_headings_clamp_to_three() {
        assert_eq!(encode("##### Deep"), vec![Block::heading(3, "Deep")]);
    }

    #[test]
    fn test_code_fence_keeps_content_verbatim() {
        let blocks = encode("```python\n# not a heading\n\n- not a list\n```\nafter");
        assert_eq!(
            blocks,
            vec![
                Block::Code {
                    language: "python".to_string(),
                    text: vec![Span::plain("# not a heading\n\n- not a list")],
                },
                Block::paragraph("after"),
            ]
        );
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let blocks = encode("```\nline one\nline two");
        assert_eq!(
            blocks,
            vec![Block::Code {
                language: String::new(),
                text: vec![Span::plain("line one\nline two")],
            }]
        );
    }

    #[test]
    fn test_toggle_drops_children() {
        let blocks = encode("<details>\n<summary>More info</summary>\nhidden child\n</details>\n\nafter");
        assert_eq!(
            blocks,
            vec![
                Block::Toggle {
                    text: vec![Span::plain("More info")]
                },
                Block::paragraph("after"),
            ]
        );
    }

    #[test]
    fn test_callout_and_quote() {
        let blocks = encode("> [!💡] Tip text\n> more\n\n> plain quote\n> continues");
        assert_eq!(
            blocks,
            vec![
                Block::Callout {
                    icon: "💡".to_string(),
                    text: vec![Span::plain("Tip text\nmore")],
                },
                Block::Quote {
                    text: vec![Span::plain("plain quote\ncontinues")],
                },
            ]
        );
    }

    #[test]
    fn test_roundtrip_lossless_variants() {
        let bold = Annotations {
            bold: true,
            ..Default::default()
        };
        let blocks = vec![
            Block::heading(1, "One"),
            Block::heading(2, "Two"),
            Block::Heading {
                level: 2,
                text: Vec::new(),
            },
            Block::heading(3, "Three"),
            Block::Paragraph {
                text: vec![Span::plain("Mixed "), Span::with("bold", bold)],
            },
            Block::BulletedItem {
                text: vec![Span::plain("bullet")],
            },
            Block::BulletedItem { text: Vec::new() },
            Block::NumberedItem {
                text: vec![Span::plain("first")],
            },
            Block::NumberedItem {
                text: vec![Span::plain("second")],
            },
            Block::NumberedItem { text: Vec::new() },
            Block::Todo {
                checked: false,
                text: vec![Span::plain("todo")],
            },
            Block::Code {
                language: "sh".to_string(),
                text: vec![Span::plain("echo hi\necho bye")],
            },
            Block::Quote {
                text: vec![Span::plain("wise words")],
            },
            Block::Divider,
            Block::paragraph("end"),
        ];

        let roundtrip = encode(&decode(&blocks));

        assert_eq!(roundtrip.len(), blocks.len());
        for (original, parsed) in blocks.iter().zip(&roundtrip) {
            assert_eq!(original.kind(), parsed.kind());
            assert_eq!(
                original.rich_text().map(plain_text),
                parsed.rich_text().map(plain_text)
            );
        }
        assert_eq!(roundtrip, blocks);
    }

    #[test]
    fn test_empty_items_keep_their_kind() {
        let kinds: Vec<&str> = encode("- \n1.\n\n##\n\n#tag")
            .iter()
            .map(Block::kind)
            .collect();
        assert_eq!(
            kinds,
            vec!["bulleted_list_item", "numbered_list_item", "heading_2", "paragraph"]
        );
    }

    #[test]
    fn test_batches_respect_limit() {
        let text: String = (0..250).map(|n| format!("- item {n}\n")).collect();
        let blocks = encode(&text);
        let sizes: Vec<usize> = batches(&blocks).map(|b| b.len()).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
    }

    #[test]
    fn test_empty_text() {
        assert!(encode("").is_empty());
        assert!(encode("\n\n  \n").is_empty());
    }
}
