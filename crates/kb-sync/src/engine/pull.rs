//! Remote → local reconciliation.

use super::{Result, SyncEngine, now_rfc3339};
use crate::document::{self, LocalDocument, file_name_for, slugify, unique_slug};
use crate::fingerprint::Fingerprint;
use crate::fs::FileSystem;
use crate::gateway::{RemoteDocument, RemoteGateway};
use crate::header::{self, DocumentHeader};
use crate::ledger::Ledger;
use crate::pacer::Clock;
use crate::transcode::decode_remote;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Outcome of a pull run. Entries are file names.
#[derive(Debug, Clone, Default)]
pub struct PullReport {
    /// Files written (or that would be written in dry-run)
    pub written: Vec<String>,
    /// Remote documents whose edit marker did not move
    pub unchanged: Vec<String>,
    pub dry_run: bool,
}

impl PullReport {
    pub fn has_changes(&self) -> bool {
        !self.written.is_empty()
    }
}

impl<G: RemoteGateway, F: FileSystem, C: Clock> SyncEngine<G, F, C> {
    /// Bring every remote document in the collection down to the store.
    pub async fn pull(&mut self, ledger: &mut Ledger) -> Result<PullReport> {
        let dry_run = self.options.dry_run;
        let mut report = PullReport {
            dry_run,
            ..Default::default()
        };

        let documents = self.query_all_documents().await?;
        let mut owners = self.local_owners().await?;
        let mut claimed: HashSet<String> = HashSet::new();

        for remote in &documents {
            let slug = assign_slug(ledger, &owners, &claimed, remote);
            claimed.insert(slug.clone());
            let file_name = file_name_for(&slug);
            let exists = self.fs.exists(&file_name).await?;

            if let Some(entry) = ledger.get(&remote.id) {
                if exists && entry.remote_edit_marker == remote.last_edited {
                    debug!("Unchanged: {} ({})", file_name, remote.id);
                    report.unchanged.push(file_name);
                    continue;
                }
            }

            let blocks = self.fetch_all_blocks(&remote.id).await?;
            // Fingerprint the body as it will read back from disk
            let body = header::normalize_body(&decode_remote(&blocks)).to_string();
            let fingerprint = Fingerprint::of(&body);

            let previous = if exists {
                Some(LocalDocument::load(&self.fs, &file_name).await?)
            } else {
                None
            };
            if let (Some(previous), Some(entry)) = (&previous, ledger.get(&remote.id)) {
                if previous.fingerprint != entry.local_fingerprint
                    && previous.fingerprint != fingerprint
                {
                    warn!(
                        "Overwriting unpushed local edits in {} with the remote version",
                        file_name
                    );
                }
            }

            let header = pulled_header(
                previous.map(|doc| doc.header).unwrap_or_default(),
                remote,
                &fingerprint,
            );

            if dry_run {
                info!("Would write {} from {}", file_name, remote.id);
            } else {
                let content = header::render(&header, &body);
                self.fs.write(&file_name, content.as_bytes()).await?;
                ledger.record_synced(
                    &remote.id,
                    &slug,
                    &remote.title,
                    &remote.last_edited,
                    &fingerprint,
                );
                self.checkpoint(ledger).await?;
                owners.insert(slug, remote.id.clone());
                info!("Pulled {} ({})", file_name, remote.id);
            }
            report.written.push(file_name);
        }

        Ok(report)
    }

    /// Slug → remote id for every local document that carries one.
    async fn local_owners(&self) -> Result<HashMap<String, String>> {
        let mut owners = HashMap::new();
        for file_name in document::list_document_files(&self.fs).await? {
            let doc = LocalDocument::load(&self.fs, &file_name).await?;
            owners.insert(doc.slug().to_string(), doc.header.id.clone());
        }
        Ok(owners)
    }
}

/// Reuse the ledger's slug, otherwise derive a fresh one that no other
/// document in the store or the ledger owns.
fn assign_slug(
    ledger: &Ledger,
    owners: &HashMap<String, String>,
    claimed: &HashSet<String>,
    remote: &RemoteDocument,
) -> String {
    if let Some(entry) = ledger.get(&remote.id) {
        return entry.slug.clone();
    }
    let is_taken = |slug: &str| {
        claimed.contains(slug)
            || ledger.slug_in_use(slug, &remote.id)
            || owners.get(slug).is_some_and(|owner| owner != &remote.id)
    };
    unique_slug(&slugify(&remote.title), is_taken)
}

fn pulled_header(
    mut header: DocumentHeader,
    remote: &RemoteDocument,
    fingerprint: &Fingerprint,
) -> DocumentHeader {
    header.id = remote.id.clone();
    header.title = remote.title.clone();
    header.doc_type = remote.doc_type.clone();
    header.status = remote.status.clone();
    header.notion_url = remote.url.clone();
    header.last_synced = now_rfc3339();
    header.content_hash = fingerprint.to_string();
    header
}
