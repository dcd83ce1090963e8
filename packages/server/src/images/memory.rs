use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::store::{
    DeleteOutcome, ImagePage, MetadataStore, NewImage, StoreError, check_filename, check_id,
    check_page,
};
use crate::entity::image;

#[derive(Default)]
struct Inner {
    last_id: i64,
    rows: BTreeMap<i64, image::Model>,
}

/// In-process [`MetadataStore`] with the same contract as the SQL store.
///
/// Used by tests and for running the service without a database.
#[derive(Default)]
pub struct InMemoryMetadataStore {
    inner: Mutex<Inner>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave `Inner` half-updated.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn insert(&self, new: NewImage) -> Result<image::Model, StoreError> {
        let mut inner = self.lock();
        if inner.rows.values().any(|row| row.filename == new.filename) {
            return Err(StoreError::Duplicate(new.filename));
        }

        inner.last_id += 1;
        let now = Utc::now();
        let model = image::Model {
            id: inner.last_id,
            filename: new.filename,
            original_filename: new.original_filename,
            url: new.url,
            file_size: new.file_size,
            content_type: new.content_type,
            upload_timestamp: new.upload_timestamp,
            created_at: now,
            updated_at: now,
        };
        inner.rows.insert(model.id, model.clone());

        Ok(model)
    }

    async fn list_page(&self, limit: u64, offset: u64) -> Result<ImagePage, StoreError> {
        check_page(limit, offset)?;

        let inner = self.lock();
        let mut rows: Vec<&image::Model> = inner.rows.values().collect();
        rows.sort_by(|a, b| {
            b.upload_timestamp
                .cmp(&a.upload_timestamp)
                .then(b.id.cmp(&a.id))
        });

        let images = rows
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok(ImagePage {
            images,
            total_count: inner.rows.len() as u64,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<image::Model>, StoreError> {
        check_id(id)?;
        Ok(self.lock().rows.get(&id).cloned())
    }

    async fn get_by_filename(&self, filename: &str) -> Result<Option<image::Model>, StoreError> {
        check_filename(filename)?;
        Ok(self
            .lock()
            .rows
            .values()
            .find(|row| row.filename == filename)
            .cloned())
    }

    async fn delete(&self, id: i64) -> Result<DeleteOutcome, StoreError> {
        check_id(id)?;
        match self.lock().rows.remove(&id) {
            Some(_) => Ok(DeleteOutcome::Deleted),
            None => Ok(DeleteOutcome::NotFound),
        }
    }
}
