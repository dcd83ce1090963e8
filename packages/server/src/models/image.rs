use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::image;
use crate::error::AppError;
use crate::images::{ImageListing, ListParams};

/// Metadata of a stored image.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ImageResponse {
    #[schema(example = 42)]
    pub id: i64,
    /// Generated storage name.
    #[schema(example = "1718000000_3f9a0c1d2e4b5a69.jpg")]
    pub filename: String,
    /// Name the client uploaded the file under.
    #[schema(example = "holiday.jpg")]
    pub original_filename: String,
    /// Public URL of the image bytes.
    #[schema(example = "/images/1718000000_3f9a0c1d2e4b5a69.jpg")]
    pub url: String,
    /// Size in bytes.
    #[schema(example = 204800)]
    pub file_size: i64,
    #[schema(example = "image/jpeg")]
    pub content_type: String,
    pub upload_timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<image::Model> for ImageResponse {
    fn from(model: image::Model) -> Self {
        Self {
            id: model.id,
            filename: model.filename,
            original_filename: model.original_filename,
            url: model.url,
            file_size: model.file_size,
            content_type: model.content_type,
            upload_timestamp: model.upload_timestamp,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Response to a successful upload.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadImageResponse {
    #[schema(example = "Image uploaded successfully")]
    pub message: String,
    pub image: ImageResponse,
}

/// Single-image envelope.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ImageEnvelope {
    pub image: ImageResponse,
}

/// Pagination values applied to a listing.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ListMetadata {
    /// Number of images across all pages.
    #[schema(example = 47)]
    pub total_count: u64,
    /// Effective page size, after defaulting and clamping.
    #[schema(example = 20)]
    pub limit: u64,
    #[schema(example = 0)]
    pub offset: u64,
    /// Whether images exist past this page.
    #[schema(example = true)]
    pub has_more: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ImageListResponse {
    pub images: Vec<ImageResponse>,
    pub metadata: ListMetadata,
}

impl From<ImageListing> for ImageListResponse {
    fn from(listing: ImageListing) -> Self {
        Self {
            images: listing.images.into_iter().map(Into::into).collect(),
            metadata: ListMetadata {
                total_count: listing.total_count,
                limit: listing.limit,
                offset: listing.offset,
                has_more: listing.has_more,
            },
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DeleteImageResponse {
    #[schema(example = "Image deleted successfully")]
    pub message: String,
    #[schema(example = 42)]
    pub id: i64,
    #[schema(example = "1718000000_3f9a0c1d2e4b5a69.jpg")]
    pub filename: String,
}

/// Query parameters for listing images.
///
/// Kept as raw strings so malformed values produce a structured
/// `VALIDATION_ERROR` rather than an extractor rejection.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListImagesQuery {
    /// Page size (at least 1; capped by the server, default 10).
    #[param(value_type = Option<u64>, example = 20)]
    pub limit: Option<String>,
    /// Number of images to skip (default 0).
    #[param(value_type = Option<u64>, example = 0)]
    pub offset: Option<String>,
}

impl ListImagesQuery {
    /// Empty values count as absent.
    pub fn parse(&self) -> Result<ListParams, AppError> {
        let limit = match non_empty(&self.limit) {
            None => None,
            Some(raw) => match raw.parse::<u64>() {
                Ok(limit) if limit >= 1 => Some(limit),
                _ => return Err(AppError::Validation("invalid limit parameter".into())),
            },
        };

        // Offsets are bound as signed 64-bit integers by the database.
        let offset = match non_empty(&self.offset) {
            None => 0,
            Some(raw) => match raw.parse::<i64>() {
                Ok(offset) if offset >= 0 => offset.unsigned_abs(),
                _ => return Err(AppError::Validation("invalid offset parameter".into())),
            },
        };

        Ok(ListParams { limit, offset })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Parse an image id path segment; ids start at 1.
pub fn parse_image_id(raw: &str) -> Result<i64, AppError> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(AppError::Validation("invalid id parameter".into())),
    }
}
