use axum::Json;
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use imaging::TransformRequest;
use tracing::{Span, instrument};

use crate::error::{AppError, ErrorBody};
use crate::models::image::{DeleteResponse, ImageMetadataResponse, UploadResponse};
use crate::service::{IngestError, Upload};
use crate::state::AppState;
use crate::utils::filename::display_name;

const CACHE_CONTROL_VALUE: &str = "private, max-age=3600";

/// Multipart framing on top of the largest accepted image.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn upload_body_limit(max_upload_size: usize) -> DefaultBodyLimit {
    DefaultBodyLimit::max(max_upload_size.saturating_add(MULTIPART_OVERHEAD))
}

/// The `image` part of an upload form, fully buffered.
struct ImagePart {
    filename: String,
    content_type: String,
    data: Vec<u8>,
}

fn reject(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(UploadResponse::rejected(message.into())),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "Images",
    operation_id = "uploadImage",
    summary = "Upload an image",
    description = "Stores the `image` multipart field. Identical bytes with the same extension \
        are stored once: re-uploading returns the existing id with status 200. \
        An optional `owner_id` text field records the owner.",
    request_body(content_type = "multipart/form-data", description = "`image` file and optional `owner_id`"),
    responses(
        (status = 201, description = "Image stored", body = UploadResponse),
        (status = 200, description = "Identical image already stored", body = UploadResponse),
        (status = 400, description = "Missing field, oversized upload or unsupported format", body = UploadResponse),
        (status = 500, description = "Storage failure (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart), fields(image_id))]
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut image: Option<ImagePart> = None;
    let mut owner_id: Option<i32> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Ok(reject(format!("failed to parse multipart form: {e}"))),
        };

        match field.name() {
            Some("image") if image.is_none() => {
                let filename = display_name(field.file_name().unwrap_or_default());
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .or_else(|| {
                        mime_guess::from_path(&filename)
                            .first()
                            .map(|m| m.essence_str().to_string())
                    })
                    .unwrap_or_default();
                let data = match field.bytes().await {
                    Ok(bytes) => bytes.to_vec(),
                    Err(e) => return Ok(reject(format!("failed to read image: {e}"))),
                };
                image = Some(ImagePart {
                    filename,
                    content_type,
                    data,
                });
            }
            Some("owner_id") => {
                // Unparseable owners are ignored rather than rejected.
                owner_id = field
                    .text()
                    .await
                    .ok()
                    .and_then(|t| t.trim().parse().ok());
            }
            _ => {} // Ignore unknown fields.
        }
    }

    let Some(image) = image else {
        return Ok(reject("no image uploaded"));
    };

    let upload = Upload {
        data: &image.data,
        filename: &image.filename,
        content_type: &image.content_type,
        owner_id,
    };

    let outcome = match state.ingestion.ingest(upload).await {
        Ok(outcome) => outcome,
        Err(e @ (IngestError::FileTooLarge { .. } | IngestError::InvalidFormat(_))) => {
            return Ok(reject(e.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    Span::current().record("image_id", outcome.id);
    let url = state.config.image_url(outcome.id);

    if outcome.already_existed {
        let body = UploadResponse::stored(outcome.id, "File already exists".into(), url);
        Ok((StatusCode::OK, Json(body)).into_response())
    } else {
        let message = format!("File {} uploaded successfully", image.filename);
        let body = UploadResponse::stored(outcome.id, message, url);
        Ok((StatusCode::CREATED, Json(body)).into_response())
    }
}

#[utoipa::path(
    get,
    path = "/image/{id}",
    tag = "Images",
    operation_id = "getImage",
    summary = "Fetch an image, optionally transformed",
    description = "Applies the requested transforms in fixed order (resize, blur, brightness, \
        contrast, grayscale, sepia, invert, rotate, fliph, flipv) and encodes to `format`, \
        or to the stored format when absent. Malformed parameters are ignored. \
        Supports ETag-based caching via If-None-Match.",
    params(
        ("id" = i32, Path, description = "Image ID"),
        ("width" = Option<u32>, Query, description = "Target width; resize needs both width and height non-zero"),
        ("height" = Option<u32>, Query, description = "Target height"),
        ("blur" = Option<f32>, Query, description = "Gaussian blur radius, applied when > 0"),
        ("brightness" = Option<f32>, Query, description = "Channel scale factor minus one; -1.0 is black"),
        ("contrast" = Option<f32>, Query, description = "Contrast scale about mid-grey minus one; -1.0 is flat grey"),
        ("grayscale" = Option<bool>, Query, description = "Exactly `true` to enable"),
        ("sepia" = Option<bool>, Query, description = "Exactly `true` to enable"),
        ("invert" = Option<bool>, Query, description = "Exactly `true` to enable"),
        ("rotate" = Option<f32>, Query, description = "Clockwise rotation in degrees"),
        ("fliph" = Option<bool>, Query, description = "Exactly `true` to enable"),
        ("flipv" = Option<bool>, Query, description = "Exactly `true` to enable"),
        ("format" = Option<String>, Query, description = "Output format: jpg, jpeg or png"),
    ),
    responses(
        (status = 200, description = "Encoded image bytes (image/png or image/jpeg)"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 400, description = "Invalid id (VALIDATION_ERROR) or format (UNSUPPORTED_FORMAT)", body = ErrorBody),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Missing blob or undecodable image (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query, headers))]
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let id = parse_id(&id)?;
    let request = TransformRequest::from_pairs(query);

    let resolved = state.retrieval.resolve(id, &request).await?;

    if etag_matches(&headers, &resolved.etag) {
        return Ok((
            StatusCode::NOT_MODIFIED,
            [
                (header::ETAG, resolved.etag),
                (header::CACHE_CONTROL, CACHE_CONTROL_VALUE.to_string()),
            ],
        )
            .into_response());
    }

    let encoded = state.retrieval.render(&resolved, &request).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, encoded.mime_type)
        .header(header::CONTENT_LENGTH, encoded.bytes.len().to_string())
        .header(header::ETAG, &resolved.etag)
        .header(header::CACHE_CONTROL, CACHE_CONTROL_VALUE)
        .body(Body::from(encoded.bytes))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

#[utoipa::path(
    get,
    path = "/image/{id}/metadata",
    tag = "Images",
    operation_id = "getImageMetadata",
    summary = "Describe a stored image",
    params(("id" = i32, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Image metadata", body = ImageMetadataResponse),
        (status = 400, description = "Invalid id (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_image_metadata(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ImageMetadataResponse>, AppError> {
    let id = parse_id(&id)?;
    let record = state.retrieval.describe(id).await?;
    let url = state.config.image_url(record.id);
    Ok(Json(ImageMetadataResponse::new(record, url)))
}

#[utoipa::path(
    delete,
    path = "/image/{id}",
    tag = "Images",
    operation_id = "deleteImage",
    summary = "Delete an image",
    description = "Removes the metadata record, then the blob. If the blob cannot be removed \
        the metadata is already gone and the request fails with 500.",
    params(("id" = i32, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Image deleted", body = DeleteResponse),
        (status = 400, description = "Invalid id (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Blob removal failed (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let id = parse_id(&id)?;
    state.deletion.delete(id).await?;

    Ok(Json(DeleteResponse {
        success: "true",
        message: "Image deleted",
        id: id.to_string(),
    }))
}

fn parse_id(raw: &str) -> Result<i32, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Validation("Invalid image ID".into()))
}

/// `If-None-Match` against a strong tag; weak (`W/`) validators and `*` match too.
fn etag_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };

    value.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate == etag || candidate.strip_prefix("W/") == Some(etag)
    })
}
