use std::sync::Arc;

use chrono::Utc;
use common::storage::{BlobName, BlobStore};
use tracing::{error, info, instrument, warn};

use super::policy::UploadPolicy;
use super::store::{DeleteOutcome, MetadataStore, NewImage};
use crate::config::{AppConfig, PaginationConfig};
use crate::entity::image;
use crate::error::AppError;
use crate::utils::filename::{generate_storage_name, validate_flat_filename};

/// A file part pulled out of an upload request, fully buffered.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Client-supplied filename, untrusted.
    pub original_filename: String,
    /// Client-declared MIME type.
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Validated pagination input. `limit: None` means "use the server default".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListParams {
    pub limit: Option<u64>,
    pub offset: u64,
}

/// A page of images with the pagination values actually applied.
#[derive(Debug, Clone)]
pub struct ImageListing {
    pub images: Vec<image::Model>,
    pub total_count: u64,
    /// Effective limit after defaulting and clamping.
    pub limit: u64,
    pub offset: u64,
    pub has_more: bool,
}

/// Upload, listing, retrieval and deletion of images.
///
/// Composes the metadata store, the blob store and the upload policy. Holds
/// no mutable state of its own; cloning is cheap.
#[derive(Clone)]
pub struct ImageService {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    policy: UploadPolicy,
    pagination: PaginationConfig,
    public_path: String,
}

impl ImageService {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        policy: UploadPolicy,
        pagination: PaginationConfig,
        public_path: impl Into<String>,
    ) -> Self {
        Self {
            metadata,
            blobs,
            policy,
            pagination,
            public_path: public_path.into(),
        }
    }

    pub fn from_config(
        config: &AppConfig,
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self::new(
            metadata,
            blobs,
            UploadPolicy::from_config(&config.upload),
            config.pagination.clone(),
            config.storage.public_path.clone(),
        )
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Public URL of a stored blob.
    pub fn public_url(&self, filename: &str) -> String {
        format!("{}/{}", self.public_path.trim_end_matches('/'), filename)
    }

    /// Validate, store the blob, then record its metadata.
    ///
    /// If the metadata insert fails, the freshly written blob is removed
    /// before the insert error is returned. A crash between the two steps
    /// still leaves an orphan blob behind.
    #[instrument(skip(self, request), fields(original_filename = %request.original_filename, size = request.data.len()))]
    pub async fn upload(&self, request: UploadRequest) -> Result<image::Model, AppError> {
        let UploadRequest {
            original_filename,
            content_type,
            data,
        } = request;

        let original_filename = validate_flat_filename(&original_filename)
            .map_err(|e| AppError::Validation(e.message().into()))?
            .to_string();
        let content_type = content_type.trim().to_string();

        self.policy.validate(data.len() as u64, &content_type)?;

        let filename = generate_storage_name(&original_filename)
            .map_err(|e| AppError::internal("unable to generate filename", e))?;
        let blob_name = BlobName::parse(filename.clone())
            .map_err(|e| AppError::internal("generated filename is not a valid blob name", e))?;

        let written = self
            .blobs
            .put_bytes(&blob_name, data)
            .await
            .map_err(|e| AppError::internal("unable to save file", e))?;

        let new_image = NewImage {
            url: self.public_url(&filename),
            filename,
            original_filename,
            file_size: i64::try_from(written).unwrap_or(i64::MAX),
            content_type,
            upload_timestamp: Utc::now(),
        };

        match self.metadata.insert(new_image).await {
            Ok(record) => {
                info!(image_id = record.id, filename = %record.filename, "Image uploaded");
                Ok(record)
            }
            Err(insert_err) => {
                self.discard_blob(&blob_name).await;
                Err(AppError::internal(
                    "unable to save image metadata",
                    insert_err,
                ))
            }
        }
    }

    /// Best-effort removal of a blob whose metadata insert failed.
    async fn discard_blob(&self, name: &BlobName) {
        match self.blobs.remove(name).await {
            Ok(_) => warn!(blob = %name, "Removed blob after failed metadata insert"),
            Err(e) => error!(
                blob = %name,
                error = %e,
                "Failed to remove blob after failed metadata insert; blob is orphaned"
            ),
        }
    }

    /// One page of images, newest first.
    pub async fn list(&self, params: ListParams) -> Result<ImageListing, AppError> {
        if params.limit == Some(0) {
            return Err(AppError::Validation("invalid limit parameter".into()));
        }

        let limit = params
            .limit
            .unwrap_or(self.pagination.default_limit)
            .min(self.pagination.max_limit);

        let page = self.metadata.list_page(limit, params.offset).await?;
        let has_more = params.offset.saturating_add(limit) < page.total_count;

        Ok(ImageListing {
            images: page.images,
            total_count: page.total_count,
            limit,
            offset: params.offset,
            has_more,
        })
    }

    pub async fn get(&self, id: i64) -> Result<image::Model, AppError> {
        self.metadata
            .get_by_id(id)
            .await?
            .ok_or_else(not_found)
    }

    pub async fn get_by_filename(&self, filename: &str) -> Result<image::Model, AppError> {
        self.metadata
            .get_by_filename(filename)
            .await?
            .ok_or_else(not_found)
    }

    /// Delete the metadata row, then best-effort remove the blob.
    ///
    /// A blob that cannot be removed is logged and otherwise ignored; the
    /// row is the authoritative record and is already gone by then.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<image::Model, AppError> {
        let record = self.get(id).await?;

        if self.metadata.delete(id).await? == DeleteOutcome::NotFound {
            // Deleted concurrently between the lookup and the delete.
            return Err(not_found());
        }

        match BlobName::parse(record.filename.clone()) {
            Ok(name) => match self.blobs.remove(&name).await {
                Ok(true) => {}
                Ok(false) => warn!(blob = %name, "Blob was already absent"),
                Err(e) => warn!(blob = %name, error = %e, "Failed to remove blob"),
            },
            Err(e) => warn!(filename = %record.filename, error = %e, "Stored filename is not a valid blob name"),
        }

        info!(image_id = id, filename = %record.filename, "Image deleted");
        Ok(record)
    }
}

fn not_found() -> AppError {
    AppError::NotFound("the requested resource could not be found".into())
}
