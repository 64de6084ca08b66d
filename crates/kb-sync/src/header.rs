//! Metadata header parsing and serialization.
//!
//! Every synchronized document starts with a YAML front matter block:
//! ```markdown
//! ---
//! id: 5f1c0c5e-...
//! title: Reading List
//! type: note
//! status: active
//! notion_url: https://www.notion.so/Reading-List-5f1c0c5e
//! last_synced: 2026-10-16T09:30:00+00:00
//! content_hash: 9b74c9897bac770f
//! ---
//!
//! Body text...
//! ```
//!
//! Parsing is forgiving: a field with an unexpected shape becomes empty and a
//! header that is not valid YAML is treated as absent, so the file is
//! considered untracked instead of aborting a run.

use serde_yaml::{Mapping, Value};
use tracing::debug;

const DELIMITER: &str = "---";

const KEY_ID: &str = "id";
const KEY_TITLE: &str = "title";
const KEY_TYPE: &str = "type";
const KEY_STATUS: &str = "status";
const KEY_NOTION_URL: &str = "notion_url";
const KEY_LAST_SYNCED: &str = "last_synced";
const KEY_CONTENT_HASH: &str = "content_hash";

/// Known metadata fields of a local document.
///
/// Empty strings mean "not set". Unknown keys are kept in `extra` in their
/// original order and written back after the known keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentHeader {
    /// Remote document id; empty until the first push or pull
    pub id: String,
    pub title: String,
    pub doc_type: String,
    pub status: String,
    /// Canonical reference to the remote document
    pub notion_url: String,
    /// RFC 3339 timestamp of the last successful sync
    pub last_synced: String,
    /// Fingerprint of the body as of the last sync
    pub content_hash: String,
    pub extra: Mapping,
}

impl DocumentHeader {
    /// Whether the document has been linked to a remote document.
    pub fn is_tracked(&self) -> bool {
        !self.id.is_empty()
    }
}

/// A local document split into header and body.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub header: DocumentHeader,
    /// Whether a well-formed header was found
    pub has_header: bool,
    /// Everything after the header, leading blank lines removed
    pub body: String,
}

/// Strip the leading blank lines a header round trip never keeps.
pub fn normalize_body(body: &str) -> &str {
    body.trim_start_matches(['\r', '\n'])
}

/// Split file content into header and body.
pub fn parse(content: &str) -> ParsedDocument {
    let untracked = || ParsedDocument {
        header: DocumentHeader::default(),
        has_header: false,
        body: normalize_body(content).to_string(),
    };

    let Some((yaml, rest)) = split_header(content) else {
        return untracked();
    };
    let body = normalize_body(rest).to_string();

    if yaml.trim().is_empty() {
        return ParsedDocument {
            header: DocumentHeader::default(),
            has_header: true,
            body,
        };
    }

    match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Mapping(mapping)) => ParsedDocument {
            header: header_from_mapping(mapping),
            has_header: true,
            body,
        },
        Ok(_) | Err(_) => {
            // Not a header; a body may open with a divider
            debug!("Ignoring unreadable metadata header");
            untracked()
        }
    }
}

/// Find the header between an opening and a closing `---` line.
fn split_header(content: &str) -> Option<(&str, &str)> {
    let first_end = content.find('\n')?;
    if content[..first_end].trim_end_matches('\r') != DELIMITER {
        return None;
    }

    let rest = &content[first_end + 1..];
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == DELIMITER {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Serialize a header and body back into file content.
pub fn render(header: &DocumentHeader, body: &str) -> String {
    let mut mapping = Mapping::new();
    let fields = [
        (KEY_ID, &header.id),
        (KEY_TITLE, &header.title),
        (KEY_TYPE, &header.doc_type),
        (KEY_STATUS, &header.status),
        (KEY_NOTION_URL, &header.notion_url),
        (KEY_LAST_SYNCED, &header.last_synced),
        (KEY_CONTENT_HASH, &header.content_hash),
    ];
    for (key, value) in fields {
        mapping.insert(Value::String(key.to_string()), Value::String(value.clone()));
    }
    for (key, value) in &header.extra {
        mapping.insert(key.clone(), value.clone());
    }

    let yaml = serde_yaml::to_string(&mapping).unwrap_or_default();
    format!("{DELIMITER}\n{yaml}{DELIMITER}\n\n{body}")
}

fn header_from_mapping(mapping: Mapping) -> DocumentHeader {
    let mut header = DocumentHeader::default();
    for (key, value) in mapping {
        let Some(name) = key.as_str() else {
            header.extra.insert(key, value);
            continue;
        };
        let slot = match name {
            KEY_ID => &mut header.id,
            KEY_TITLE => &mut header.title,
            KEY_TYPE => &mut header.doc_type,
            KEY_STATUS => &mut header.status,
            KEY_NOTION_URL => &mut header.notion_url,
            KEY_LAST_SYNCED => &mut header.last_synced,
            KEY_CONTENT_HASH => &mut header.content_hash,
            _ => {
                header.extra.insert(key, value);
                continue;
            }
        };
        *slot = scalar_to_string(name, value);
    }
    header
}

fn scalar_to_string(key: &str, value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => {
            debug!("Header field '{}' is not a scalar, treating as empty", key);
            String::new()
        }
    }
}
