//! Local document listing with sync state.

use kb_sync::document::{self, LocalDocument};
use kb_sync::fs::{FileSystem, Result};
use kb_sync::{Ledger, classify};
use serde::Serialize;

/// One row of `kb list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListEntry {
    pub slug: String,
    pub title: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub status: String,
    /// Push classification: new, orphaned, synced, modified or conflict
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Read every document in the store and classify it against the ledger.
pub async fn list_entries<F: FileSystem>(fs: &F, ledger: &Ledger) -> Result<Vec<ListEntry>> {
    let mut entries = Vec::new();
    for file_name in document::list_document_files(fs).await? {
        let doc = LocalDocument::load(fs, &file_name).await?;
        let non_empty = |value: &str| (!value.is_empty()).then(|| value.to_string());
        entries.push(ListEntry {
            slug: doc.slug().to_string(),
            title: doc.title().to_string(),
            doc_type: doc.header.doc_type.clone(),
            status: doc.header.status.clone(),
            state: classify(&doc, ledger).to_string(),
            id: non_empty(&doc.header.id),
            url: non_empty(&doc.header.notion_url),
        });
    }
    Ok(entries)
}
