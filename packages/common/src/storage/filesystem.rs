use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::error::StorageError;
use super::key::BlobKey;
use super::traits::{BlobStore, verify_digest};

/// Filesystem-backed content-addressed blob store.
///
/// Blobs are sharded by the first digest byte:
/// `{base_path}/{2 hex chars}/{remaining 62 hex chars}.{ext}`
///
/// Writes land in `{base_path}/.tmp` first and are renamed into place, so a
/// concurrent reader sees either nothing or the complete blob.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
}

impl FilesystemBlobStore {
    /// Open (creating if needed) a store rooted at `base_path`.
    pub async fn new(base_path: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self { base_path })
    }

    fn blob_path(&self, key: &BlobKey) -> PathBuf {
        let hash = key.hash();
        self.base_path
            .join(hash.shard())
            .join(format!("{}.{}", hash.shard_rest(), key.extension()))
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn save(&self, key: &BlobKey, data: &[u8]) -> Result<(), StorageError> {
        verify_digest(key, data)?;

        let blob_path = self.blob_path(key);
        if fs::try_exists(&blob_path).await? {
            debug!(%key, "blob already present");
            return Ok(());
        }

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Same key means same bytes, so losing a rename race to another writer is harmless.
        if let Err(e) = fs::rename(&temp_path, &blob_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(%key, size = data.len(), "blob written");
        Ok(())
    }

    async fn get(&self, key: &BlobKey) -> Result<Vec<u8>, StorageError> {
        match fs::read(self.blob_path(key)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &BlobKey) -> Result<(), StorageError> {
        match fs::remove_file(self.blob_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &BlobKey) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.blob_path(key)).await?)
    }
}
