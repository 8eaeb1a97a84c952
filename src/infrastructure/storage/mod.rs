//! Blob Storage
//!
//! Local-directory implementation of the domain `BlobStore` trait. Files are
//! written under `uploads.dir` and served by the router under
//! `uploads.public_path`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::config::UploadSettings;
use crate::domain::BlobStore;
use crate::shared::error::AppError;

/// Writes attachment bytes to a local directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_path: String,
}

impl LocalBlobStore {
    pub fn new(settings: &UploadSettings) -> Self {
        Self {
            root: PathBuf::from(&settings.dir),
            public_path: settings.public_path.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Keys must be plain file names: no separators, no parent references.
fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && !key.contains('/')
        && !key.contains('\\')
        && !key.starts_with('.')
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, AppError> {
        if !is_safe_key(key) {
            return Err(AppError::InvalidArgument(format!("Invalid file key: {}", key)));
        }

        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(key);
        tokio::fs::write(&path, &bytes).await?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "Stored attachment");

        Ok(format!("{}/{}", self.public_path, key))
    }
}
