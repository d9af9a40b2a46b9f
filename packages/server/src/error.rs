use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use imaging::ImagingError;
use sea_orm::DbErr;
use serde::Serialize;

use crate::service::{DeleteError, IngestError, RetrieveError};

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`,
    /// `UNSUPPORTED_FORMAT`, `NOT_FOUND`, `INTERNAL_ERROR`.
    #[schema(example = "NOT_FOUND")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Image not found")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    /// Requested output format is not one of the supported set.
    UnsupportedFormat(String),
    NotFound(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::UnsupportedFormat(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "UNSUPPORTED_FORMAT",
                    message: msg,
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<ImagingError> for AppError {
    fn from(err: ImagingError) -> Self {
        match err {
            ImagingError::UnsupportedFormat { .. } => AppError::UnsupportedFormat(err.to_string()),
            ImagingError::Transform(msg) => AppError::Validation(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::FileTooLarge { .. } | IngestError::InvalidFormat(_) => {
                AppError::Validation(err.to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<RetrieveError> for AppError {
    fn from(err: RetrieveError) -> Self {
        match err {
            RetrieveError::NotFound(_) => AppError::NotFound("Image not found".into()),
            RetrieveError::Imaging(e) => e.into(),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<DeleteError> for AppError {
    fn from(err: DeleteError) -> Self {
        match err {
            DeleteError::NotFound(_) => AppError::NotFound("Image not found".into()),
            other => AppError::Internal(other.to_string()),
        }
    }
}
