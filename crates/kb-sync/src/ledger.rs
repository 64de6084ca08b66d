//! Sync ledger: the last synchronized state of every tracked document.
//!
//! Stored as `.sync/ledger.json` in the store:
//! ```json
//! {
//!   "documents": {
//!     "<remote id>": {
//!       "slug": "reading-list",
//!       "title": "Reading List",
//!       "remoteEditMarker": "2026-10-16T09:30:00.000Z",
//!       "localFingerprint": "9b74c9897bac770f",
//!       "remoteFingerprint": "9b74c9897bac770f"
//!     }
//!   },
//!   "lastSync": "2026-10-16T09:30:02+00:00"
//! }
//! ```

use crate::fingerprint::Fingerprint;
use crate::fs::{FileSystem, FsError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Directory holding sync state inside the store.
pub const STATE_DIR: &str = ".sync";

/// Ledger location relative to the store root.
pub const LEDGER_PATH: &str = ".sync/ledger.json";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger storage error: {0}")]
    Fs(#[from] FsError),

    #[error("Corrupt ledger {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize ledger: {0}")]
    Serialize(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Last synchronized state of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub slug: String,
    pub title: String,
    pub remote_edit_marker: String,
    pub local_fingerprint: Fingerprint,
    pub remote_fingerprint: Fingerprint,
}

impl LedgerEntry {
    /// Both sides agree on the content last synchronized.
    pub fn is_clean(&self) -> bool {
        self.local_fingerprint == self.remote_fingerprint
    }
}

/// All tracked documents, keyed by remote id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    #[serde(default)]
    pub documents: BTreeMap<String, LedgerEntry>,
    #[serde(default)]
    pub last_sync: Option<String>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the ledger from the store. A missing file yields an empty ledger.
    pub async fn load<F: FileSystem>(fs: &F) -> Result<Self> {
        let content = match fs.read_to_string(LEDGER_PATH).await {
            Ok(content) => content,
            Err(FsError::NotFound(_)) => {
                debug!("No ledger at {}, starting empty", LEDGER_PATH);
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content).map_err(|source| LedgerError::Corrupt {
            path: LEDGER_PATH.to_string(),
            source,
        })
    }

    pub async fn save<F: FileSystem>(&self, fs: &F) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(LedgerError::Serialize)?;
        fs.write(LEDGER_PATH, content.as_bytes()).await?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&LedgerEntry> {
        self.documents.get(id)
    }

    /// Record a clean sync: both fingerprints set to `fingerprint`.
    pub fn record_synced(
        &mut self,
        id: &str,
        slug: &str,
        title: &str,
        remote_edit_marker: &str,
        fingerprint: &Fingerprint,
    ) {
        self.documents.insert(
            id.to_string(),
            LedgerEntry {
                slug: slug.to_string(),
                title: title.to_string(),
                remote_edit_marker: remote_edit_marker.to_string(),
                local_fingerprint: fingerprint.clone(),
                remote_fingerprint: fingerprint.clone(),
            },
        );
    }

    /// Whether a document other than `except_id` already owns `slug`.
    pub fn slug_in_use(&self, slug: &str, except_id: &str) -> bool {
        self.documents
            .iter()
            .any(|(id, entry)| id != except_id && entry.slug == slug)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
