//! Local-disk implementation of the `FileStorageService` port.

use async_trait::async_trait;
use chrono::Utc;
use component_forge_core::ports::{FileStorageService, PortError, PortResult, StoredFile};
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes uploads into a single directory that is also served at `/uploads`.
#[derive(Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    /// Creates the store, making sure the directory exists.
    pub async fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Keeps ASCII alphanumerics, dots, dashes and underscores; everything else
/// (including path separators) becomes an underscore.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

#[async_trait]
impl FileStorageService for LocalFileStore {
    async fn store(&self, original_name: &str, bytes: &[u8]) -> PortResult<StoredFile> {
        let filename = format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            sanitize_file_name(original_name)
        );
        tokio::fs::write(self.root.join(&filename), bytes)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to store upload: {}", e)))?;

        info!("Stored upload {} ({} bytes)", filename, bytes.len());
        Ok(StoredFile {
            filename,
            size: bytes.len() as u64,
        })
    }
}
