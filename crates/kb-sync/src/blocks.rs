//! Typed remote content: blocks made of annotated text spans.

/// Hard limit on blocks per append/create request.
pub const MAX_BLOCKS_PER_REQUEST: usize = 100;

/// Inline formatting of a text span.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
    pub strikethrough: bool,
    pub link: Option<String>,
}

impl Annotations {
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

/// A run of text sharing the same annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub annotations: Annotations,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            annotations: Annotations::default(),
        }
    }

    pub fn with(text: impl Into<String>, annotations: Annotations) -> Self {
        Self {
            text: text.into(),
            annotations,
        }
    }
}

pub type RichText = Vec<Span>;

/// Concatenated text of a span sequence, annotations dropped.
pub fn plain_text(spans: &[Span]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

/// The block variants the transcoder understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph { text: RichText },
    /// Level is clamped to 1..=3
    Heading { level: u8, text: RichText },
    BulletedItem { text: RichText },
    NumberedItem { text: RichText },
    Todo { checked: bool, text: RichText },
    /// Nested children are not modeled
    Toggle { text: RichText },
    Code { language: String, text: RichText },
    Quote { text: RichText },
    Divider,
    Callout { icon: String, text: RichText },
}

impl Block {
    pub fn paragraph(text: &str) -> Self {
        Block::Paragraph {
            text: vec![Span::plain(text)],
        }
    }

    pub fn heading(level: u8, text: &str) -> Self {
        Block::Heading {
            level: level.clamp(1, 3),
            text: vec![Span::plain(text)],
        }
    }

    /// Remote type name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Paragraph { .. } => "paragraph",
            Block::Heading { level: 1, .. } => "heading_1",
            Block::Heading { level: 2, .. } => "heading_2",
            Block::Heading { .. } => "heading_3",
            Block::BulletedItem { .. } => "bulleted_list_item",
            Block::NumberedItem { .. } => "numbered_list_item",
            Block::Todo { .. } => "to_do",
            Block::Toggle { .. } => "toggle",
            Block::Code { .. } => "code",
            Block::Quote { .. } => "quote",
            Block::Divider => "divider",
            Block::Callout { .. } => "callout",
        }
    }

    /// Text content of the block, if it carries any.
    pub fn rich_text(&self) -> Option<&[Span]> {
        match self {
            Block::Paragraph { text }
            | Block::Heading { text, .. }
            | Block::BulletedItem { text }
            | Block::NumberedItem { text }
            | Block::Todo { text, .. }
            | Block::Toggle { text }
            | Block::Code { text, .. }
            | Block::Quote { text }
            | Block::Callout { text, .. } => Some(text),
            Block::Divider => None,
        }
    }
}

/// A block as stored remotely: its id plus content, if the variant is modeled.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteBlock {
    pub id: String,
    /// Remote type name, kept for unmodeled variants
    pub kind: String,
    /// `None` for variants this crate does not model
    pub block: Option<Block>,
}

impl RemoteBlock {
    pub fn new(id: impl Into<String>, block: Block) -> Self {
        Self {
            id: id.into(),
            kind: block.kind().to_string(),
            block: Some(block),
        }
    }

    pub fn unsupported(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            block: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_level_is_clamped() {
        assert_eq!(Block::heading(7, "x").kind(), "heading_3");
        assert_eq!(Block::heading(0, "x").kind(), "heading_1");
    }

    #[test]
    fn test_plain_text_concatenates_spans() {
        let spans = vec![
            Span::plain("Hello "),
            Span::with(
                "world",
                Annotations {
                    bold: true,
                    ..Default::default()
                },
            ),
        ];
        assert_eq!(plain_text(&spans), "Hello world");
    }
}
