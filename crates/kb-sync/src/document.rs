//! LocalDocument: one synchronized markdown file in the store.
//!
//! Documents live at the store root as `<slug>.md`. The slug is derived from
//! the title once and never changes afterwards, even if the title does.

use crate::fingerprint::Fingerprint;
use crate::fs::{FileSystem, Result};
use crate::header::{self, DocumentHeader};

/// Extension of document files in the store.
pub const DOCUMENT_EXTENSION: &str = ".md";

/// Maximum slug length in characters.
pub const MAX_SLUG_LEN: usize = 60;

const FALLBACK_SLUG: &str = "untitled";

/// A document read from the local store.
#[derive(Debug, Clone)]
pub struct LocalDocument {
    /// File name relative to the store root (`<slug>.md`)
    pub file_name: String,
    pub header: DocumentHeader,
    pub body: String,
    /// Fingerprint of `body` as it is on disk right now
    pub fingerprint: Fingerprint,
}

impl LocalDocument {
    /// Read and parse a document file.
    pub async fn load<F: FileSystem>(fs: &F, file_name: &str) -> Result<Self> {
        let content = fs.read_to_string(file_name).await?;
        Ok(Self::from_content(file_name, &content))
    }

    pub fn from_content(file_name: &str, content: &str) -> Self {
        let parsed = header::parse(content);
        let fingerprint = Fingerprint::of(&parsed.body);
        Self {
            file_name: file_name.to_string(),
            header: parsed.header,
            body: parsed.body,
            fingerprint,
        }
    }

    /// Slug of this document (the file name without extension).
    pub fn slug(&self) -> &str {
        slug_from_file_name(&self.file_name).unwrap_or(&self.file_name)
    }

    /// Title from the header, falling back to the slug for untitled files.
    pub fn title(&self) -> &str {
        if self.header.title.is_empty() {
            self.slug()
        } else {
            &self.header.title
        }
    }

    /// Full file content (header + body).
    pub fn render(&self) -> String {
        header::render(&self.header, &self.body)
    }
}

/// Derive a filesystem-safe slug from a title.
///
/// ASCII alphanumerics are lowercased and kept; every other run of
/// characters becomes a single `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Append `-2`, `-3`, ... until `is_taken` returns false.
pub fn unique_slug(base: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

pub fn file_name_for(slug: &str) -> String {
    format!("{slug}{DOCUMENT_EXTENSION}")
}

pub fn slug_from_file_name(file_name: &str) -> Option<&str> {
    file_name.strip_suffix(DOCUMENT_EXTENSION)
}

/// File names of every document at the store root, sorted.
pub async fn list_document_files<F: FileSystem>(fs: &F) -> Result<Vec<String>> {
    let mut names: Vec<String> = fs
        .list("")
        .await?
        .into_iter()
        .filter(|entry| !entry.is_dir && !entry.name.starts_with('.'))
        .map(|entry| entry.name)
        .filter(|name| slug_from_file_name(name).is_some_and(|slug| !slug.is_empty()))
        .collect();
    names.sort();
    Ok(names)
}
