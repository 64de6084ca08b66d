//! Block ↔ text transcoder.
//!
//! `decode` turns remote blocks into markdown, `encode` parses markdown back
//! into blocks. The round trip preserves block type and text for paragraphs,
//! headings, list items, todos, code, quotes and dividers. Known losses:
//! - toggle children are dropped
//! - unmodeled remote block types are skipped
//! - blank lines and empty paragraphs are not preserved
//! - markdown markers typed literally in text may be read back as annotations

mod decode;
mod encode;
mod inline;

pub use decode::{decode, decode_remote};
pub use encode::{batches, encode};
pub use inline::{parse_spans, render_spans};
