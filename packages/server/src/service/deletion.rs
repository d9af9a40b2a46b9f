use std::sync::Arc;

use common::storage::{BlobKey, BlobStore, StorageError};
use tracing::{error, info};

use super::index::{IndexError, MetadataIndex};
use crate::entity::image_metadata;

#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    #[error("image {0} not found")]
    NotFound(i32),

    #[error(transparent)]
    Index(#[from] IndexError),

    /// Metadata is already gone; the blob could not be removed.
    #[error("metadata for image {id} removed but blob deletion failed: {source}")]
    Blob { id: i32, source: StorageError },
}

/// Removes an image's metadata record, then its blob.
///
/// If the blob removal fails after the record is gone, the blob is left
/// unreferenced. The failure is logged with the key so it can be reclaimed.
pub struct DeletionCoordinator {
    blobs: Arc<dyn BlobStore>,
    index: Arc<dyn MetadataIndex>,
}

impl DeletionCoordinator {
    pub fn new(blobs: Arc<dyn BlobStore>, index: Arc<dyn MetadataIndex>) -> Self {
        Self { blobs, index }
    }

    pub async fn delete(&self, id: i32) -> Result<image_metadata::Model, DeleteError> {
        let record = self
            .index
            .delete(id)
            .await?
            .ok_or(DeleteError::NotFound(id))?;

        let result = match record.filename.parse::<BlobKey>() {
            Ok(key) => self.blobs.delete(&key).await,
            Err(e) => Err(e),
        };

        if let Err(source) = result {
            error!(
                id,
                filename = %record.filename,
                error = %source,
                "image metadata deleted but blob removal failed; blob is dangling"
            );
            return Err(DeleteError::Blob { id, source });
        }

        info!(id, filename = %record.filename, "image deleted");
        Ok(record)
    }
}
