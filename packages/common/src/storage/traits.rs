use async_trait::async_trait;

use super::error::StorageError;
use super::key::BlobKey;

/// Content-addressed key → bytes storage.
///
/// Implementations must make `save` safe under concurrent calls with the same
/// key: readers never observe a partially written blob.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key`. Saving an existing key is a no-op.
    async fn save(&self, key: &BlobKey, data: &[u8]) -> Result<(), StorageError>;

    /// Retrieve all bytes stored under `key`.
    async fn get(&self, key: &BlobKey) -> Result<Vec<u8>, StorageError>;

    /// Remove the blob. A missing key is reported as [`StorageError::NotFound`].
    async fn delete(&self, key: &BlobKey) -> Result<(), StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, key: &BlobKey) -> Result<bool, StorageError>;
}

/// Reject `data` whose digest differs from the key's.
pub(crate) fn verify_digest(key: &BlobKey, data: &[u8]) -> Result<(), StorageError> {
    let actual = super::hash::ContentHash::compute(data);
    if actual != *key.hash() {
        return Err(StorageError::DigestMismatch {
            expected: key.hash().to_hex(),
            actual: actual.to_hex(),
        });
    }
    Ok(())
}
