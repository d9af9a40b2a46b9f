use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "image_metadata")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Blob key, `{sha256 hex}.{ext}`.
    #[sea_orm(unique)]
    pub filename: String,

    /// Lowercase extension without the dot: `jpg`, `jpeg` or `png`.
    pub format: String,

    /// Size of the blob in bytes.
    pub size: i64,

    pub owner_id: Option<i32>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
