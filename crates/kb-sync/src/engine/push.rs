//! Local → remote reconciliation.
//!
//! Every document in the store is classified from three fingerprints:
//! `C` (body as it is now), `L` (ledger's local fingerprint) and `R`
//! (ledger's remote fingerprint). The checks run in a fixed order:
//!
//! | Condition                      | Classification   | Action               |
//! |--------------------------------|------------------|----------------------|
//! | no id in header                | Create           | create remotely      |
//! | id but no ledger entry         | Orphaned         | skip                 |
//! | `C == L`                       | Unchanged        | skip                 |
//! | `C != L`, `L == R`             | OnlyLocalChanged | replace remote blocks|
//! | `C != L`, `L != R`             | Conflict         | skip and report      |
//!
//! An orphaned document is never recreated: it was removed from tracking on
//! purpose or its provenance is unknown.

use super::{Result, SyncEngine, now_rfc3339};
use crate::blocks::Block;
use crate::conflicts::{self, ConflictRecord};
use crate::document::{self, LocalDocument};
use crate::fs::FileSystem;
use crate::gateway::{DocumentProperties, RemoteGateway};
use crate::header::DocumentHeader;
use crate::ledger::Ledger;
use crate::pacer::Clock;
use crate::transcode::{batches, encode};
use std::fmt;
use tracing::{debug, info, warn};

/// Push decision for one local document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Create,
    Orphaned,
    Unchanged,
    OnlyLocalChanged,
    Conflict,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Classification::Create => "new",
            Classification::Orphaned => "orphaned",
            Classification::Unchanged => "synced",
            Classification::OnlyLocalChanged => "modified",
            Classification::Conflict => "conflict",
        };
        f.write_str(label)
    }
}

/// Classify a local document against the ledger.
pub fn classify(doc: &LocalDocument, ledger: &Ledger) -> Classification {
    if !doc.header.is_tracked() {
        return Classification::Create;
    }
    let Some(entry) = ledger.get(&doc.header.id) else {
        return Classification::Orphaned;
    };
    if doc.fingerprint == entry.local_fingerprint {
        Classification::Unchanged
    } else if entry.local_fingerprint == entry.remote_fingerprint {
        Classification::OnlyLocalChanged
    } else {
        Classification::Conflict
    }
}

/// Outcome of a push run. Entries are file names.
#[derive(Debug, Clone, Default)]
pub struct PushReport {
    pub created: Vec<String>,
    pub pushed: Vec<String>,
    pub unchanged: Vec<String>,
    pub orphaned: Vec<String>,
    pub conflicts: Vec<ConflictRecord>,
    pub dry_run: bool,
}

impl PushReport {
    pub fn has_changes(&self) -> bool {
        !self.created.is_empty() || !self.pushed.is_empty()
    }
}

impl<G: RemoteGateway, F: FileSystem, C: Clock> SyncEngine<G, F, C> {
    /// Send local changes to the remote collection.
    pub async fn push(&mut self, ledger: &mut Ledger) -> Result<PushReport> {
        let dry_run = self.options.dry_run;
        let mut report = PushReport {
            dry_run,
            ..Default::default()
        };

        for file_name in document::list_document_files(&self.fs).await? {
            let doc = LocalDocument::load(&self.fs, &file_name).await?;
            let classification = classify(&doc, ledger);
            debug!("{}: {:?}", file_name, classification);

            match classification {
                Classification::Create => {
                    if dry_run {
                        info!("Would create {}", file_name);
                    } else {
                        self.create_remote(doc, ledger).await?;
                    }
                    report.created.push(file_name);
                }
                Classification::Orphaned => {
                    warn!(
                        "Skipping {}: id {} is not in the ledger",
                        file_name, doc.header.id
                    );
                    report.orphaned.push(file_name);
                }
                Classification::Unchanged => report.unchanged.push(file_name),
                Classification::OnlyLocalChanged => {
                    if dry_run {
                        info!("Would push {}", file_name);
                    } else {
                        self.replace_remote(doc, ledger).await?;
                    }
                    report.pushed.push(file_name);
                }
                Classification::Conflict => {
                    warn!("Conflict in {}: changed locally and remotely", file_name);
                    if let Some(entry) = ledger.get(&doc.header.id) {
                        report.conflicts.push(ConflictRecord {
                            file: file_name,
                            remote_id: doc.header.id.clone(),
                            current_local: doc.fingerprint.clone(),
                            synced_local: entry.local_fingerprint.clone(),
                            synced_remote: entry.remote_fingerprint.clone(),
                            url: doc.header.notion_url.clone(),
                        });
                    }
                }
            }
        }

        if !report.conflicts.is_empty() && !dry_run {
            conflicts::write_report(&self.fs, &report.conflicts, &now_rfc3339()).await?;
            warn!(
                "{} conflict(s) written to {}",
                report.conflicts.len(),
                conflicts::CONFLICTS_PATH
            );
        }

        Ok(report)
    }

    /// Create the remote document, then link the local file to it.
    async fn create_remote(&mut self, mut doc: LocalDocument, ledger: &mut Ledger) -> Result<()> {
        let blocks = encode(&doc.body);
        let mut chunks = batches(&blocks);
        let first: &[Block] = chunks.next().unwrap_or(&[]);

        let mut properties = header_properties(&doc.header);
        properties.title = Some(doc.title().to_string());

        self.pacer.acquire().await;
        let created = self
            .gateway
            .create_document(&self.options.collection_id, &properties, first)
            .await?;
        for chunk in chunks {
            self.pacer.acquire().await;
            self.gateway.append_block_children(&created.id, chunk).await?;
        }

        let now = now_rfc3339();
        let title = doc.title().to_string();
        doc.header.id = created.id.clone();
        doc.header.title = title.clone();
        doc.header.notion_url = created.url;
        doc.header.last_synced = now.clone();
        doc.header.content_hash = doc.fingerprint.to_string();
        self.fs
            .write(&doc.file_name, doc.render().as_bytes())
            .await?;

        ledger.record_synced(&created.id, doc.slug(), &title, &now, &doc.fingerprint);
        self.checkpoint(ledger).await?;
        info!("Created {} as {}", doc.file_name, created.id);
        Ok(())
    }

    /// Replace the remote content with the local body.
    async fn replace_remote(&mut self, mut doc: LocalDocument, ledger: &mut Ledger) -> Result<()> {
        let id = doc.header.id.clone();

        // TODO: diff blocks instead of delete-then-append; a failure between
        // the two steps leaves the remote document empty until the next push.
        let existing = self.fetch_all_blocks(&id).await?;
        for block in &existing {
            self.pacer.acquire().await;
            self.gateway.delete_block(&block.id).await?;
        }

        let blocks = encode(&doc.body);
        for chunk in batches(&blocks) {
            self.pacer.acquire().await;
            self.gateway.append_block_children(&id, chunk).await?;
        }

        let properties = header_properties(&doc.header);
        if !properties.is_empty() {
            self.pacer.acquire().await;
            self.gateway.patch_properties(&id, &properties).await?;
        }

        let now = now_rfc3339();
        let slug = ledger
            .get(&id)
            .map(|entry| entry.slug.clone())
            .unwrap_or_else(|| doc.slug().to_string());
        ledger.record_synced(&id, &slug, doc.title(), &now, &doc.fingerprint);

        doc.header.last_synced = now;
        doc.header.content_hash = doc.fingerprint.to_string();
        self.fs
            .write(&doc.file_name, doc.render().as_bytes())
            .await?;
        self.checkpoint(ledger).await?;
        info!(
            "Pushed {} ({} blocks replaced by {})",
            doc.file_name,
            existing.len(),
            blocks.len()
        );
        Ok(())
    }
}

/// Properties set in the header; empty fields are left alone remotely.
fn header_properties(header: &DocumentHeader) -> DocumentProperties {
    let non_empty = |value: &str| (!value.is_empty()).then(|| value.to_string());
    DocumentProperties {
        title: non_empty(&header.title),
        doc_type: non_empty(&header.doc_type),
        status: non_empty(&header.status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::Fingerprint;

    fn tracked(id: &str, body: &str) -> LocalDocument {
        LocalDocument::from_content("doc.md", &format!("---\nid: {id}\n---\n\n{body}"))
    }

    #[test]
    fn test_classification_order() {
        let mut ledger = Ledger::new();
        let h1 = Fingerprint::of("h1");
        ledger.record_synced("a", "doc", "Doc", "m1", &h1);

        let untracked = LocalDocument::from_content("doc.md", "h1");
        assert_eq!(classify(&untracked, &ledger), Classification::Create);
        assert_eq!(classify(&tracked("zzz", "h1"), &ledger), Classification::Orphaned);
        assert_eq!(classify(&tracked("a", "h1"), &ledger), Classification::Unchanged);
        assert_eq!(
            classify(&tracked("a", "h2"), &ledger),
            Classification::OnlyLocalChanged
        );

        ledger.documents.get_mut("a").unwrap().remote_fingerprint = Fingerprint::of("h3");
        assert_eq!(classify(&tracked("a", "h4"), &ledger), Classification::Conflict);
        // Unchanged wins even when the ledger itself disagrees
        assert_eq!(classify(&tracked("a", "h1"), &ledger), Classification::Unchanged);
    }

    #[test]
    fn test_header_properties_skip_empty_fields() {
        let header = DocumentHeader {
            title: "Alpha".to_string(),
            status: "active".to_string(),
            ..Default::default()
        };
        let properties = header_properties(&header);
        assert_eq!(properties.title.as_deref(), Some("Alpha"));
        assert!(properties.doc_type.is_none());
        assert_eq!(properties.status.as_deref(), Some("active"));
    }
}
