use std::sync::Arc;

use common::storage::BlobStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::service::{
    DbMetadataIndex, DeletionCoordinator, IngestionCoordinator, MetadataIndex,
    RetrievalCoordinator,
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub ingestion: Arc<IngestionCoordinator>,
    pub retrieval: Arc<RetrievalCoordinator>,
    pub deletion: Arc<DeletionCoordinator>,
}

impl AppState {
    /// Wire the coordinators over `blobs` and the `image_metadata` table.
    pub fn new(config: AppConfig, db: DatabaseConnection, blobs: Arc<dyn BlobStore>) -> Self {
        let index: Arc<dyn MetadataIndex> = Arc::new(DbMetadataIndex::new(db));

        Self {
            ingestion: Arc::new(IngestionCoordinator::new(
                blobs.clone(),
                index.clone(),
                config.storage.max_upload_size,
            )),
            retrieval: Arc::new(RetrievalCoordinator::new(blobs.clone(), index.clone())),
            deletion: Arc::new(DeletionCoordinator::new(blobs, index)),
            config,
        }
    }
}
