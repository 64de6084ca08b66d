//! Conversion between Notion API JSON and kb-sync types.

use kb_sync::blocks::{Annotations, Block, RemoteBlock, RichText, Span, plain_text};
use kb_sync::gateway::{DocumentProperties, GatewayError, RemoteDocument, Result};
use serde_json::{Map, Value, json};

use crate::config::StatusKind;

/// Notion rejects text objects longer than this.
pub const MAX_TEXT_LEN: usize = 2000;

/// Notion's name for a code block without a language.
const PLAIN_TEXT_LANGUAGE: &str = "plain text";

/// Names and kinds of the database properties kb maps to.
#[derive(Debug, Clone)]
pub struct PropertySchema {
    pub type_property: String,
    pub status_property: String,
    pub status_kind: StatusKind,
}

// =========================================================================
// Rich text
// =========================================================================

pub fn rich_text_to_json(spans: &[Span]) -> Value {
    let mut items = Vec::new();
    for span in spans {
        for chunk in split_text(&span.text, MAX_TEXT_LEN) {
            items.push(text_object(chunk, &span.annotations));
        }
    }
    Value::Array(items)
}

fn text_object(content: &str, annotations: &Annotations) -> Value {
    let link = annotations
        .link
        .as_ref()
        .map(|url| json!({ "url": url }))
        .unwrap_or(Value::Null);
    json!({
        "type": "text",
        "text": { "content": content, "link": link },
        "annotations": {
            "bold": annotations.bold,
            "italic": annotations.italic,
            "strikethrough": annotations.strikethrough,
            "underline": false,
            "code": annotations.code,
            "color": "default",
        },
    })
}

/// Split on character boundaries into pieces of at most `max` chars.
fn split_text(text: &str, max: usize) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (index, _) in text.char_indices() {
        if count == max {
            pieces.push(&text[start..index]);
            start = index;
            count = 0;
        }
        count += 1;
    }
    pieces.push(&text[start..]);
    pieces
}

pub fn rich_text_from_json(value: &Value) -> RichText {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let text = item.get("plain_text").and_then(Value::as_str)?;
            let flags = &item["annotations"];
            let flag = |name: &str| flags.get(name).and_then(Value::as_bool).unwrap_or(false);
            Some(Span::with(
                text,
                Annotations {
                    bold: flag("bold"),
                    italic: flag("italic"),
                    code: flag("code"),
                    strikethrough: flag("strikethrough"),
                    link: item.get("href").and_then(Value::as_str).map(str::to_string),
                },
            ))
        })
        .collect()
}

// =========================================================================
// Blocks
// =========================================================================

pub fn block_to_json(block: &Block) -> Value {
    let kind = block.kind();
    let body = match block {
        Block::Divider => json!({}),
        Block::Todo { checked, text } => json!({
            "rich_text": rich_text_to_json(text),
            "checked": checked,
        }),
        Block::Code { language, text } => {
            let language = if language.is_empty() {
                PLAIN_TEXT_LANGUAGE
            } else {
                language.as_str()
            };
            json!({ "rich_text": rich_text_to_json(text), "language": language })
        }
        Block::Callout { icon, text } => {
            let mut body = json!({ "rich_text": rich_text_to_json(text) });
            if !icon.is_empty() {
                body["icon"] = json!({ "type": "emoji", "emoji": icon });
            }
            body
        }
        Block::Paragraph { text }
        | Block::Heading { text, .. }
        | Block::BulletedItem { text }
        | Block::NumberedItem { text }
        | Block::Toggle { text }
        | Block::Quote { text } => json!({ "rich_text": rich_text_to_json(text) }),
    };
    let mut object = Map::new();
    object.insert("object".to_string(), json!("block"));
    object.insert("type".to_string(), json!(kind));
    object.insert(kind.to_string(), body);
    Value::Object(object)
}

/// Parse a block object. Types kb does not model come back unsupported.
pub fn block_from_json(value: &Value) -> Result<RemoteBlock> {
    let id = str_field(value, "id")?;
    let kind = str_field(value, "type")?;
    let body = &value[kind];
    let text = || rich_text_from_json(&body["rich_text"]);

    let block = match kind {
        "paragraph" => Block::Paragraph { text: text() },
        "heading_1" => Block::Heading { level: 1, text: text() },
        "heading_2" => Block::Heading { level: 2, text: text() },
        "heading_3" => Block::Heading { level: 3, text: text() },
        "bulleted_list_item" => Block::BulletedItem { text: text() },
        "numbered_list_item" => Block::NumberedItem { text: text() },
        "to_do" => Block::Todo {
            checked: body["checked"].as_bool().unwrap_or(false),
            text: text(),
        },
        "toggle" => Block::Toggle { text: text() },
        "code" => {
            let language = body["language"].as_str().unwrap_or_default();
            Block::Code {
                language: if language == PLAIN_TEXT_LANGUAGE {
                    String::new()
                } else {
                    language.to_string()
                },
                text: text(),
            }
        }
        "quote" => Block::Quote { text: text() },
        "divider" => Block::Divider,
        "callout" => Block::Callout {
            icon: body["icon"]["emoji"].as_str().unwrap_or_default().to_string(),
            text: text(),
        },
        other => return Ok(RemoteBlock::unsupported(id, other)),
    };
    Ok(RemoteBlock::new(id, block))
}

// =========================================================================
// Pages and properties
// =========================================================================

/// Read a database query result into a `RemoteDocument`.
pub fn document_from_page(page: &Value, schema: &PropertySchema) -> Result<RemoteDocument> {
    let properties = page
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| GatewayError::Decode("page without properties".to_string()))?;

    // The title property can have any name; it is the one typed "title"
    let title = properties
        .values()
        .find(|p| p["type"] == "title")
        .map(|p| plain_text(&rich_text_from_json(&p["title"])))
        .unwrap_or_default();

    Ok(RemoteDocument {
        id: str_field(page, "id")?.to_string(),
        title,
        doc_type: option_name(properties.get(&schema.type_property)),
        status: option_name(properties.get(&schema.status_property)),
        url: page["url"].as_str().unwrap_or_default().to_string(),
        last_edited: str_field(page, "last_edited_time")?.to_string(),
    })
}

/// Name of a select or status option, empty when unset.
fn option_name(property: Option<&Value>) -> String {
    let Some(property) = property else {
        return String::new();
    };
    ["select", "status"]
        .iter()
        .find_map(|kind| property[*kind]["name"].as_str())
        .unwrap_or_default()
        .to_string()
}

pub fn properties_to_json(properties: &DocumentProperties, schema: &PropertySchema) -> Value {
    let mut out = Map::new();
    if let Some(title) = &properties.title {
        out.insert(
            "title".to_string(),
            json!({ "title": rich_text_to_json(&[Span::plain(title.as_str())]) }),
        );
    }
    if let Some(doc_type) = &properties.doc_type {
        out.insert(
            schema.type_property.clone(),
            json!({ "select": { "name": doc_type } }),
        );
    }
    if let Some(status) = &properties.status {
        let kind = match schema.status_kind {
            StatusKind::Select => "select",
            StatusKind::Status => "status",
        };
        let mut option = Map::new();
        option.insert(kind.to_string(), json!({ "name": status }));
        out.insert(schema.status_property.clone(), Value::Object(option));
    }
    Value::Object(out)
}

fn str_field<'a>(value: &'a Value, field: &str) -> Result<&'a str> {
    value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::Decode(format!("missing field '{field}'")))
}
