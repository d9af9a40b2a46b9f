use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr, TransactionTrait,
};

use crate::entity::image_metadata;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("metadata index: {0}")]
    Database(#[from] DbErr),
}

/// Fields supplied by the caller when recording a new blob.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub filename: String,
    pub format: String,
    pub size: i64,
    pub owner_id: Option<i32>,
}

/// Result of [`MetadataIndex::insert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(image_metadata::Model),
    /// A record with the same `filename` already exists; nothing was written.
    Conflict,
}

/// Maps image ids to blob keys. At most one record exists per `filename`.
#[async_trait]
pub trait MetadataIndex: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<image_metadata::Model>, IndexError>;

    async fn find_by_filename(
        &self,
        filename: &str,
    ) -> Result<Option<image_metadata::Model>, IndexError>;

    async fn insert(&self, image: NewImage) -> Result<InsertOutcome, IndexError>;

    /// Remove the record and return it, or `None` if no such id exists.
    async fn delete(&self, id: i32) -> Result<Option<image_metadata::Model>, IndexError>;
}

/// [`MetadataIndex`] over the `image_metadata` table.
#[derive(Clone)]
pub struct DbMetadataIndex {
    db: DatabaseConnection,
}

impl DbMetadataIndex {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MetadataIndex for DbMetadataIndex {
    async fn find_by_id(&self, id: i32) -> Result<Option<image_metadata::Model>, IndexError> {
        Ok(image_metadata::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_by_filename(
        &self,
        filename: &str,
    ) -> Result<Option<image_metadata::Model>, IndexError> {
        Ok(image_metadata::Entity::find()
            .filter(image_metadata::Column::Filename.eq(filename))
            .one(&self.db)
            .await?)
    }

    async fn insert(&self, image: NewImage) -> Result<InsertOutcome, IndexError> {
        let now = Utc::now();
        let model = image_metadata::ActiveModel {
            filename: Set(image.filename),
            format: Set(image.format),
            size: Set(image.size),
            owner_id: Set(image.owner_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        match model.insert(&self.db).await {
            Ok(inserted) => Ok(InsertOutcome::Inserted(inserted)),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(InsertOutcome::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: i32) -> Result<Option<image_metadata::Model>, IndexError> {
        let txn = self.db.begin().await?;
        let Some(existing) = image_metadata::Entity::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };
        image_metadata::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(Some(existing))
    }
}
