use axum::Json;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::multipart::AppMultipart;
use crate::extractors::query::AppQuery;
use crate::images::{UploadPolicy, UploadRequest};
use crate::models::image::*;
use crate::state::AppState;

/// Headroom on top of the file ceiling for multipart boundaries and headers.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Content type assumed for a file part that declares none.
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

pub fn upload_body_limit(max_size: u64) -> DefaultBodyLimit {
    let limit = max_size.saturating_add(MULTIPART_OVERHEAD);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

#[utoipa::path(
    post,
    path = "/images",
    tag = "Images",
    operation_id = "uploadImage",
    summary = "Upload an image",
    description = "Uploads a JPEG image as the `image` multipart field (`file` is accepted as an alias). \
        The file is stored under a generated name and its metadata is recorded. \
        Only the first file field is used; other fields are ignored.",
    request_body(content_type = "multipart/form-data", description = "Image file"),
    responses(
        (status = 201, description = "Image uploaded", body = UploadImageResponse),
        (status = 400, description = "Malformed request or missing file (VALIDATION_ERROR)", body = ErrorBody),
        (status = 413, description = "File exceeds the size limit (PAYLOAD_TOO_LARGE)", body = ErrorBody),
        (status = 415, description = "Content type not allowed (UNSUPPORTED_MEDIA_TYPE)", body = ErrorBody),
        (status = 500, description = "Storage failure (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_image(
    State(state): State<AppState>,
    AppMultipart(mut multipart): AppMultipart,
) -> Result<impl IntoResponse, AppError> {
    let mut upload: Option<UploadRequest> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("image") | Some("file") if upload.is_none() => {
                let original_filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;
                let content_type = field
                    .content_type()
                    .unwrap_or(FALLBACK_CONTENT_TYPE)
                    .to_string();
                let data = read_file_field(field, state.images.policy()).await?;

                upload = Some(UploadRequest {
                    original_filename,
                    content_type,
                    data,
                });
            }
            _ => {} // Ignore unknown fields.
        }
    }

    let request =
        upload.ok_or_else(|| AppError::Validation("Missing 'image' file field".into()))?;
    let record = state.images.upload(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadImageResponse {
            message: "Image uploaded successfully".into(),
            image: record.into(),
        }),
    ))
}

/// Buffer a file part, giving up as soon as it passes the size ceiling.
async fn read_file_field(mut field: Field<'_>, policy: &UploadPolicy) -> Result<Vec<u8>, AppError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        policy.check_size((data.len() + chunk.len()) as u64)?;
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::Validation(format!("Multipart error: {}", err.body_text()))
    }
}

#[utoipa::path(
    get,
    path = "/images",
    tag = "Images",
    operation_id = "listImages",
    summary = "List images",
    description = "Returns images newest first. `limit` defaults to 10 and is capped at 20; \
        `offset` defaults to 0.",
    params(ListImagesQuery),
    responses(
        (status = 200, description = "Page of images", body = ImageListResponse),
        (status = 400, description = "Invalid limit or offset (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_images(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListImagesQuery>,
) -> Result<Json<ImageListResponse>, AppError> {
    let params = query.parse()?;
    let listing = state.images.list(params).await?;
    Ok(Json(listing.into()))
}

#[utoipa::path(
    get,
    path = "/images/{id}",
    tag = "Images",
    operation_id = "getImage",
    summary = "Get image metadata by ID",
    params(("id" = i64, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Image metadata", body = ImageEnvelope),
        (status = 400, description = "Invalid ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ImageEnvelope>, AppError> {
    let id = parse_image_id(&id)?;
    let record = state.images.get(id).await?;
    Ok(Json(ImageEnvelope {
        image: record.into(),
    }))
}

#[utoipa::path(
    get,
    path = "/images/by-filename/{filename}",
    tag = "Images",
    operation_id = "getImageByFilename",
    summary = "Get image metadata by storage filename",
    params(("filename" = String, Path, description = "Generated storage filename")),
    responses(
        (status = 200, description = "Image metadata", body = ImageEnvelope),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_image_by_filename(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<ImageEnvelope>, AppError> {
    let record = state.images.get_by_filename(&filename).await?;
    Ok(Json(ImageEnvelope {
        image: record.into(),
    }))
}

#[utoipa::path(
    delete,
    path = "/images/{id}",
    tag = "Images",
    operation_id = "deleteImage",
    summary = "Delete an image",
    description = "Deletes the metadata record, then removes the stored file. \
        A file that cannot be removed is logged and does not fail the request.",
    params(("id" = i64, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Image deleted", body = DeleteImageResponse),
        (status = 400, description = "Invalid ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteImageResponse>, AppError> {
    let id = parse_image_id(&id)?;
    let record = state.images.delete(id).await?;
    Ok(Json(DeleteImageResponse {
        message: "Image deleted successfully".into(),
        id: record.id,
        filename: record.filename,
    }))
}
