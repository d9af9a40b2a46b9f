use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::image_metadata;

/// Response body for `POST /upload`.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 1)]
    pub id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "File cat.png uploaded successfully")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "http://localhost:8080/image/1")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResponse {
    pub fn stored(id: i32, message: String, url: String) -> Self {
        Self {
            success: true,
            id: Some(id),
            message: Some(message),
            url: Some(url),
            error: None,
        }
    }

    pub fn rejected(error: String) -> Self {
        Self {
            success: false,
            id: None,
            message: None,
            url: None,
            error: Some(error),
        }
    }
}

/// Response body for `DELETE /image/{id}`.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DeleteResponse {
    /// Always the string `"true"`.
    #[schema(example = "true")]
    pub success: &'static str,
    #[schema(example = "Image deleted")]
    pub message: &'static str,
    #[schema(example = "1")]
    pub id: String,
}

/// Stored metadata of one image.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ImageMetadataResponse {
    #[schema(example = 1)]
    pub id: i32,
    /// Blob key: SHA-256 hex digest plus extension.
    #[schema(example = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08.png")]
    pub filename: String,
    #[schema(example = "png")]
    pub format: String,
    /// Size in bytes.
    #[schema(example = 48213)]
    pub size: i64,
    pub owner_id: Option<i32>,
    #[schema(example = "http://localhost:8080/image/1")]
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImageMetadataResponse {
    pub fn new(model: image_metadata::Model, url: String) -> Self {
        Self {
            id: model.id,
            filename: model.filename,
            format: model.format,
            size: model.size,
            owner_id: model.owner_id,
            url,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
