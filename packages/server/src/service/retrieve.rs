use std::sync::Arc;

use common::storage::{BlobKey, BlobStore, ContentHash, StorageError};
use imaging::{EncodedImage, ImagingError, OutputFormat, TransformRequest};
use tracing::debug;

use super::index::{IndexError, MetadataIndex};
use crate::entity::image_metadata;

#[derive(Debug, thiserror::Error)]
pub enum RetrieveError {
    #[error("image {0} not found")]
    NotFound(i32),

    /// Metadata exists but the blob store has no bytes for it.
    #[error("blob {0} referenced by metadata is missing from storage")]
    MissingBlob(String),

    #[error(transparent)]
    Imaging(#[from] ImagingError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("image worker failed: {0}")]
    Worker(String),
}

/// A read request after metadata lookup and format negotiation, before any
/// blob I/O.
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    pub record: image_metadata::Model,
    pub key: BlobKey,
    pub format: OutputFormat,
    /// Quoted entity tag identifying the exact bytes a render would produce.
    pub etag: String,
}

/// Lookup → fetch → decode → transform → encode.
pub struct RetrievalCoordinator {
    blobs: Arc<dyn BlobStore>,
    index: Arc<dyn MetadataIndex>,
}

impl RetrievalCoordinator {
    pub fn new(blobs: Arc<dyn BlobStore>, index: Arc<dyn MetadataIndex>) -> Self {
        Self { blobs, index }
    }

    /// Metadata record for `id`.
    pub async fn describe(&self, id: i32) -> Result<image_metadata::Model, RetrieveError> {
        self.index
            .find_by_id(id)
            .await?
            .ok_or(RetrieveError::NotFound(id))
    }

    pub async fn resolve(
        &self,
        id: i32,
        request: &TransformRequest,
    ) -> Result<ResolvedImage, RetrieveError> {
        let record = self.describe(id).await?;
        let format = imaging::negotiate(request.format.as_deref(), &record.format)?;
        let key: BlobKey = record.filename.parse()?;
        let etag = entity_tag(&key, request, format);

        Ok(ResolvedImage {
            record,
            key,
            format,
            etag,
        })
    }

    /// Produce the response bytes for a resolved image. Pixel work runs on the
    /// blocking pool.
    pub async fn render(
        &self,
        resolved: &ResolvedImage,
        request: &TransformRequest,
    ) -> Result<EncodedImage, RetrieveError> {
        let data = match self.blobs.get(&resolved.key).await {
            Ok(data) => data,
            Err(StorageError::NotFound(key)) => return Err(RetrieveError::MissingBlob(key)),
            Err(e) => return Err(e.into()),
        };

        let stored_format = resolved.record.format.clone();
        let request = request.clone();
        let format = resolved.format;
        let id = resolved.record.id;

        let encoded = tokio::task::spawn_blocking(move || {
            let image = imaging::decode(&data, &stored_format)?;
            let image = imaging::apply(image, &request)?;
            imaging::encode(&image, format)
        })
        .await
        .map_err(|e| RetrieveError::Worker(e.to_string()))??;

        debug!(id, %format, bytes = encoded.bytes.len(), "image rendered");
        Ok(encoded)
    }

    pub async fn retrieve(
        &self,
        id: i32,
        request: &TransformRequest,
    ) -> Result<EncodedImage, RetrieveError> {
        let resolved = self.resolve(id, request).await?;
        self.render(&resolved, request).await
    }
}

/// `"{digest}-{transform fingerprint}-{format}"`. Requests that enable the
/// same stages with the same parameters share a tag.
fn entity_tag(key: &BlobKey, request: &TransformRequest, format: OutputFormat) -> String {
    let stages = imaging::plan(request);
    let fingerprint = if stages.is_empty() {
        "original".to_string()
    } else {
        let chain = stages
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";");
        ContentHash::compute(chain.as_bytes()).short()
    };
    format!("\"{}-{fingerprint}-{format}\"", key.hash())
}
