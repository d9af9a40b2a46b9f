use std::sync::Arc;

use common::storage::{BlobKey, BlobStore, StorageError};
use imaging::SUPPORTED_FORMATS;
use tracing::{debug, info, warn};

use super::index::{IndexError, InsertOutcome, MetadataIndex, NewImage};
use crate::utils::filename::{content_subtype, storage_extension};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("the uploaded image is too big: {size}. Please upload an image up to {limit}")]
    FileTooLarge { size: usize, limit: usize },

    #[error("unsupported image format: {0}, upload one of the following: jpg, jpeg, png")]
    InvalidFormat(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Index(#[from] IndexError),

    /// Insert reported a uniqueness conflict, yet no record exists for the key.
    #[error("metadata for {0} conflicted on insert but could not be found")]
    Inconsistent(String),
}

/// One uploaded file as handed over by the HTTP layer.
#[derive(Debug, Clone, Copy)]
pub struct Upload<'a> {
    pub data: &'a [u8],
    /// Original client filename.
    pub filename: &'a str,
    /// Declared MIME type, e.g. `image/png`.
    pub content_type: &'a str,
    pub owner_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub id: i32,
    pub key: BlobKey,
    /// `true` when identical content was already stored; nothing was written.
    pub already_existed: bool,
}

/// Hash, dedup, store and index uploaded images.
pub struct IngestionCoordinator {
    blobs: Arc<dyn BlobStore>,
    index: Arc<dyn MetadataIndex>,
    max_size: usize,
}

impl IngestionCoordinator {
    pub fn new(blobs: Arc<dyn BlobStore>, index: Arc<dyn MetadataIndex>, max_size: usize) -> Self {
        Self {
            blobs,
            index,
            max_size,
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub async fn ingest(&self, upload: Upload<'_>) -> Result<IngestOutcome, IngestError> {
        if upload.data.len() > self.max_size {
            return Err(IngestError::FileTooLarge {
                size: upload.data.len(),
                limit: self.max_size,
            });
        }

        let subtype = content_subtype(upload.content_type);
        if !SUPPORTED_FORMATS.contains(&subtype.as_str()) {
            return Err(IngestError::InvalidFormat(subtype));
        }

        let extension = storage_extension(upload.filename, &subtype);
        let key = BlobKey::for_content(upload.data, &extension)?;
        let filename = key.to_string();

        if let Some(existing) = self.index.find_by_filename(&filename).await? {
            debug!(id = existing.id, %key, "content already stored");
            return Ok(IngestOutcome {
                id: existing.id,
                key,
                already_existed: true,
            });
        }

        self.blobs.save(&key, upload.data).await?;

        let record = NewImage {
            filename: filename.clone(),
            format: key.extension().to_string(),
            size: upload.data.len() as i64,
            owner_id: upload.owner_id,
        };

        match self.index.insert(record).await? {
            InsertOutcome::Inserted(model) => {
                info!(id = model.id, %key, size = model.size, "image ingested");
                Ok(IngestOutcome {
                    id: model.id,
                    key,
                    already_existed: false,
                })
            }
            InsertOutcome::Conflict => {
                // A concurrent upload of the same bytes committed first.
                let existing = self
                    .index
                    .find_by_filename(&filename)
                    .await?
                    .ok_or_else(|| IngestError::Inconsistent(filename.clone()))?;
                warn!(id = existing.id, %key, "lost metadata insert race, reusing record");
                Ok(IngestOutcome {
                    id: existing.id,
                    key,
                    already_existed: true,
                })
            }
        }
    }
}
