//! SyncEngine: reconciles the local store with a remote collection.
//!
//! Both directions work from the ledger instead of a version history:
//! - pull compares each remote document's edit marker with the one recorded
//!   at the last sync and rewrites the local file when it moved
//! - push compares three fingerprints (current body, last synced local,
//!   last synced remote) to decide whether overwriting the remote copy is safe
//!
//! Documents are processed one at a time. Any store or gateway error aborts
//! the run; documents finished before the failure keep their new state
//! because the ledger is checkpointed after every changed document.

mod pull;
mod push;

pub use pull::PullReport;
pub use push::{Classification, PushReport, classify};

use crate::blocks::RemoteBlock;
use crate::fs::{FileSystem, FsError};
use crate::gateway::{GatewayError, RemoteDocument, RemoteGateway};
use crate::ledger::{Ledger, LedgerError};
use crate::pacer::{Clock, Pacer, TokioClock};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Local store error: {0}")]
    Fs(#[from] FsError),

    #[error("Remote error: {0}")]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Per-run settings.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Remote collection (database) holding the documents
    pub collection_id: String,
    /// Read and compare, but write nothing locally or remotely
    pub dry_run: bool,
}

/// Drives pull and push against one store and one remote collection.
pub struct SyncEngine<G, F, C: Clock = TokioClock> {
    gateway: G,
    fs: F,
    pacer: Pacer<C>,
    options: SyncOptions,
}

impl<G: RemoteGateway, F: FileSystem, C: Clock> SyncEngine<G, F, C> {
    pub fn new(gateway: G, fs: F, pacer: Pacer<C>, options: SyncOptions) -> Self {
        Self {
            gateway,
            fs,
            pacer,
            options,
        }
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.options.dry_run = dry_run;
    }

    /// Pull, then push.
    pub async fn sync(&mut self, ledger: &mut Ledger) -> Result<(PullReport, PushReport)> {
        let pulled = self.pull(ledger).await?;
        let pushed = self.push(ledger).await?;
        Ok((pulled, pushed))
    }

    /// Every document in the collection, following cursors until exhausted.
    pub async fn query_all_documents(&mut self) -> Result<Vec<RemoteDocument>> {
        let mut documents = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            self.pacer.acquire().await;
            let page = self
                .gateway
                .query_documents(&self.options.collection_id, cursor.as_deref())
                .await?;
            documents.extend(page.items);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        debug!("Queried {} remote documents", documents.len());
        Ok(documents)
    }

    /// Every top-level block of a document, following cursors until exhausted.
    pub async fn fetch_all_blocks(&mut self, document_id: &str) -> Result<Vec<RemoteBlock>> {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            self.pacer.acquire().await;
            let page = self
                .gateway
                .fetch_block_children(document_id, cursor.as_deref())
                .await?;
            blocks.extend(page.items);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(blocks)
    }

    /// Persist the ledger after a document changed. No-op in dry-run.
    async fn checkpoint(&self, ledger: &Ledger) -> Result<()> {
        if self.options.dry_run {
            return Ok(());
        }
        ledger.save(&self.fs).await?;
        Ok(())
    }
}

/// Timestamp used for sync times and pushed edit markers.
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
