use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::entity::image;

/// Fields of an image record known before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub filename: String,
    pub original_filename: String,
    pub url: String,
    pub file_size: i64,
    pub content_type: String,
    pub upload_timestamp: DateTime<Utc>,
}

/// One page of image records plus the total number of records.
#[derive(Debug, Clone)]
pub struct ImagePage {
    pub images: Vec<image::Model>,
    pub total_count: u64,
}

/// Result of deleting a record by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// No row had this id. An expected outcome, not a fault.
    NotFound,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("an image with filename '{0}' already exists")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// Persistence of image metadata records.
///
/// Records are immutable once inserted; the only mutation is deletion.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Persist a new record, assigning its id and server-side timestamps.
    async fn insert(&self, image: NewImage) -> Result<image::Model, StoreError>;

    /// Records ordered by `upload_timestamp` descending, plus the total count.
    ///
    /// `limit` is used as given; clamping it is the caller's decision.
    /// Values beyond `i64::MAX` are rejected without querying.
    async fn list_page(&self, limit: u64, offset: u64) -> Result<ImagePage, StoreError>;

    /// Rejects `id < 1` without querying.
    async fn get_by_id(&self, id: i64) -> Result<Option<image::Model>, StoreError>;

    /// Rejects an empty filename without querying.
    async fn get_by_filename(&self, filename: &str) -> Result<Option<image::Model>, StoreError>;

    /// Rejects `id < 1` without querying.
    async fn delete(&self, id: i64) -> Result<DeleteOutcome, StoreError>;
}

pub(crate) fn check_id(id: i64) -> Result<(), StoreError> {
    if id < 1 {
        return Err(StoreError::InvalidArgument("invalid image ID".into()));
    }
    Ok(())
}

pub(crate) fn check_filename(filename: &str) -> Result<(), StoreError> {
    if filename.is_empty() {
        return Err(StoreError::InvalidArgument(
            "filename cannot be empty".into(),
        ));
    }
    Ok(())
}

/// Pagination values must fit the signed 64-bit integers SQL binds them as.
pub(crate) fn check_page(limit: u64, offset: u64) -> Result<(), StoreError> {
    if i64::try_from(limit).is_err() {
        return Err(StoreError::InvalidArgument("invalid limit parameter".into()));
    }
    if i64::try_from(offset).is_err() {
        return Err(StoreError::InvalidArgument(
            "invalid offset parameter".into(),
        ));
    }
    Ok(())
}

/// [`MetadataStore`] backed by the `image` table through SeaORM.
#[derive(Clone)]
pub struct SeaOrmMetadataStore {
    db: DatabaseConnection,
}

impl SeaOrmMetadataStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MetadataStore for SeaOrmMetadataStore {
    async fn insert(&self, new: NewImage) -> Result<image::Model, StoreError> {
        let now = Utc::now();
        let model = image::ActiveModel {
            filename: Set(new.filename.clone()),
            original_filename: Set(new.original_filename),
            url: Set(new.url),
            file_size: Set(new.file_size),
            content_type: Set(new.content_type),
            upload_timestamp: Set(new.upload_timestamp),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        match model.insert(&self.db).await {
            Ok(inserted) => {
                info!(
                    image_id = inserted.id,
                    filename = %inserted.filename,
                    "Image inserted successfully"
                );
                Ok(inserted)
            }
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                warn!(filename = %new.filename, "Duplicate image filename");
                Err(StoreError::Duplicate(new.filename))
            }
            Err(e) => {
                error!(error = %e, filename = %new.filename, "Failed to insert image");
                Err(e.into())
            }
        }
    }

    async fn list_page(&self, limit: u64, offset: u64) -> Result<ImagePage, StoreError> {
        check_page(limit, offset)?;

        let total_count = image::Entity::find()
            .count(&self.db)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to get total image count"))?;

        let images = image::Entity::find()
            .order_by_desc(image::Column::UploadTimestamp)
            .order_by_desc(image::Column::Id)
            .offset(Some(offset))
            .limit(Some(limit))
            .all(&self.db)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to query images"))?;

        info!(
            total_count,
            returned_count = images.len(),
            limit,
            offset,
            "Images retrieved successfully"
        );

        Ok(ImagePage {
            images,
            total_count,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<image::Model>, StoreError> {
        check_id(id)?;

        let found = image::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .inspect_err(|e| error!(error = %e, image_id = id, "Failed to get image by ID"))?;

        match &found {
            Some(_) => info!(image_id = id, "Image retrieved successfully"),
            None => warn!(image_id = id, "Image not found"),
        }
        Ok(found)
    }

    async fn get_by_filename(&self, filename: &str) -> Result<Option<image::Model>, StoreError> {
        check_filename(filename)?;

        let found = image::Entity::find()
            .filter(image::Column::Filename.eq(filename))
            .one(&self.db)
            .await
            .inspect_err(
                |e| error!(error = %e, filename, "Failed to get image by filename"),
            )?;

        Ok(found)
    }

    async fn delete(&self, id: i64) -> Result<DeleteOutcome, StoreError> {
        check_id(id)?;

        let result = image::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .inspect_err(|e| error!(error = %e, image_id = id, "Failed to delete image"))?;

        if result.rows_affected == 0 {
            return Ok(DeleteOutcome::NotFound);
        }

        info!(image_id = id, "Image deleted successfully");
        Ok(DeleteOutcome::Deleted)
    }
}
