//! Blocks → markdown text.

use super::inline::render_spans;
use crate::blocks::{Block, RemoteBlock, plain_text};
use tracing::debug;

/// Render blocks as markdown.
///
/// Consecutive list items are separated by a single newline, every other
/// pair of blocks by a blank line. Non-empty output ends with a newline.
pub fn decode(blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut previous: Option<&Block> = None;
    let mut number = 0usize;

    for block in blocks {
        number = match block {
            Block::NumberedItem { .. } => number + 1,
            _ => 0,
        };
        let rendered = render_block(block, number);

        if let Some(prev) = previous {
            out.push_str(if is_list_item(prev) && is_list_item(block) {
                "\n"
            } else {
                "\n\n"
            });
        }
        out.push_str(&rendered);
        previous = Some(block);
    }

    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Render fetched blocks, skipping variants that are not modeled.
pub fn decode_remote(blocks: &[RemoteBlock]) -> String {
    let known: Vec<Block> = blocks
        .iter()
        .filter_map(|remote| {
            if remote.block.is_none() {
                debug!("Skipping unsupported block {} ({})", remote.id, remote.kind);
            }
            remote.block.clone()
        })
        .collect();
    decode(&known)
}

fn is_list_item(block: &Block) -> bool {
    matches!(
        block,
        Block::BulletedItem { .. } | Block::NumberedItem { .. } | Block::Todo { .. }
    )
}

fn render_block(block: &Block, number: usize) -> String {
    match block {
        Block::Paragraph { text } => render_spans(text),
        Block::Heading { level, text } => {
            let marks = "#".repeat((*level).clamp(1, 3) as usize);
            format!("{marks} {}", render_spans(text))
        }
        Block::BulletedItem { text } => format!("- {}", render_spans(text)),
        Block::NumberedItem { text } => format!("{number}. {}", render_spans(text)),
        Block::Todo { checked, text } => {
            let mark = if *checked { 'x' } else { ' ' };
            format!("- [{mark}] {}", render_spans(text))
        }
        Block::Toggle { text } => {
            format!("<details>\n<summary>{}</summary>\n</details>", render_spans(text))
        }
        Block::Code { language, text } => {
            format!("```{language}\n{}\n```", plain_text(text))
        }
        Block::Quote { text } => prefix_lines("> ", &render_spans(text)),
        Block::Divider => "---".to_string(),
        Block::Callout { icon, text } => {
            prefix_lines("> ", &format!("[!{icon}] {}", render_spans(text)))
        }
    }
}

fn prefix_lines(prefix: &str, text: &str) -> String {
    text.split('\n')
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
