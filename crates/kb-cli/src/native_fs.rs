//! Native filesystem implementation using tokio::fs.

use async_trait::async_trait;
use kb_sync::fs::{FileEntry, FileSystem, FsError, Result};
use rand::Rng;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Store rooted at a directory on disk.
pub struct NativeFs {
    base_path: PathBuf,
}

impl NativeFs {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn full_path(&self, path: &str) -> PathBuf {
        if path.is_empty() {
            self.base_path.clone()
        } else {
            self.base_path.join(path)
        }
    }

    /// Generate a random hex string for temp file names.
    fn random_hex() -> String {
        let bytes: [u8; 16] = rand::rng().random();
        hex::encode(bytes)
    }

    /// Write to a sibling temp file, then rename over the target.
    ///
    /// Readers see either the old content or the new content, never a
    /// partially written file.
    async fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
        let temp_path = path.with_extension(format!("{}.tmp", Self::random_hex()));

        if let Err(e) = fs::write(&temp_path, content).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        Ok(())
    }
}

fn io_error(path: &str, e: std::io::Error) -> FsError {
    if e.kind() == ErrorKind::NotFound {
        FsError::NotFound(path.to_string())
    } else {
        FsError::Io(format!("{path}: {e}"))
    }
}

#[async_trait]
impl FileSystem for NativeFs {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        fs::read(self.full_path(path))
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);

        // Create parent directories if needed
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(path, e))?;
        }

        Self::atomic_write(&full_path, content)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn list(&self, path: &str) -> Result<Vec<FileEntry>> {
        let mut entries = Vec::new();

        let mut dir = fs::read_dir(self.full_path(path))
            .await
            .map_err(|e| io_error(path, e))?;

        while let Some(entry) = dir.next_entry().await.map_err(|e| io_error(path, e))? {
            let name = entry.file_name().to_string_lossy().to_string();
            let file_type = entry.file_type().await.map_err(|e| io_error(path, e))?;

            entries.push(FileEntry {
                name,
                is_dir: file_type.is_dir(),
            });
        }

        Ok(entries)
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        fs::try_exists(self.full_path(path))
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn mkdir(&self, path: &str) -> Result<()> {
        fs::create_dir_all(self.full_path(path))
            .await
            .map_err(|e| io_error(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_parents_and_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let fs = NativeFs::new(temp.path().to_path_buf());

        fs.write(".sync/ledger.json", b"{}").await.unwrap();
        fs.write(".sync/ledger.json", b"{\"documents\":{}}").await.unwrap();

        let content = fs.read_to_string(".sync/ledger.json").await.unwrap();
        assert_eq!(content, "{\"documents\":{}}");

        let entries = fs.list(".sync").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "ledger.json");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        let fs = NativeFs::new(temp.path().to_path_buf());

        assert!(!fs.exists("missing.md").await.unwrap());
        assert!(matches!(
            fs.read("missing.md").await,
            Err(FsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_marks_directories() {
        let temp = TempDir::new().unwrap();
        let fs = NativeFs::new(temp.path().to_path_buf());
        fs.write("alpha.md", b"a").await.unwrap();
        fs.mkdir(".sync").await.unwrap();

        let mut entries = fs.list("").await.unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(entries[0].name, ".sync");
        assert!(entries[0].is_dir);
        assert_eq!(entries[1].name, "alpha.md");
        assert!(!entries[1].is_dir);
    }
}
