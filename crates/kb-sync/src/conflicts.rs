//! Conflict report written after a push run that skipped conflicting documents.
//!
//! The report is regenerated from scratch on every run that has at least one
//! conflict. It never touches the ledger or the remote side.

use crate::fingerprint::Fingerprint;
use crate::fs::{FileSystem, Result};
use std::fmt::Write;

/// Report location relative to the store root.
pub const CONFLICTS_PATH: &str = ".sync/conflicts.md";

/// A document that changed on both sides since the last sync.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictRecord {
    pub file: String,
    pub remote_id: String,
    /// Fingerprint of the body as it is now
    pub current_local: Fingerprint,
    /// Local fingerprint recorded at the last sync
    pub synced_local: Fingerprint,
    /// Remote fingerprint recorded at the last sync
    pub synced_remote: Fingerprint,
    /// Canonical reference to the remote document, if known
    pub url: String,
}

/// Render the report text.
pub fn render_report(conflicts: &[ConflictRecord], generated_at: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Sync conflicts\n");
    let _ = writeln!(out, "Generated: {generated_at}");
    let _ = writeln!(out, "Conflicting documents: {}\n", conflicts.len());
    let _ = writeln!(
        out,
        "These documents changed locally and remotely since the last sync and were not pushed.\n\
         To resolve one, move the local file aside, run `kb pull` to restore the remote version,\n\
         merge your edits into it and run `kb push`."
    );

    for conflict in conflicts {
        let _ = writeln!(out, "\n## {}\n", conflict.file);
        let _ = writeln!(out, "- Remote id: {}", conflict.remote_id);
        let _ = writeln!(out, "- Current local fingerprint: {}", conflict.current_local);
        let _ = writeln!(out, "- Last synced local fingerprint: {}", conflict.synced_local);
        let _ = writeln!(out, "- Last synced remote fingerprint: {}", conflict.synced_remote);
        if conflict.url.is_empty() {
            let _ = writeln!(out, "- Remote: (unknown)");
        } else {
            let _ = writeln!(out, "- Remote: {}", conflict.url);
        }
    }
    out
}

/// Overwrite the report in the store.
pub async fn write_report<F: FileSystem>(
    fs: &F,
    conflicts: &[ConflictRecord],
    generated_at: &str,
) -> Result<()> {
    fs.write(CONFLICTS_PATH, render_report(conflicts, generated_at).as_bytes())
        .await
}
