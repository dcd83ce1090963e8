use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufReader};

use super::error::StorageError;
use super::name::BlobName;
use super::traits::{BlobStore, BoxReader};

/// Filesystem-backed blob store.
///
/// Blobs are stored flat as `{base_path}/{name}`. The directory is created on
/// demand by every write, so it may be removed out from under a running store.
#[derive(Debug, Clone)]
pub struct FilesystemBlobStore {
    base_path: PathBuf,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store rooted at `base_path`.
    ///
    /// The directory is not touched until the first write.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Create the store and make sure its directory exists right away.
    pub async fn open(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let store = Self::new(base_path);
        fs::create_dir_all(&store.base_path).await?;
        Ok(store)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Compute the filesystem path for a given blob name.
    pub fn blob_path(&self, name: &BlobName) -> PathBuf {
        self.base_path.join(name.as_str())
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, name: &BlobName, mut reader: BoxReader) -> Result<u64, StorageError> {
        fs::create_dir_all(&self.base_path).await?;

        let blob_path = self.blob_path(name);
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&blob_path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let written = async {
            let n = tokio::io::copy(&mut reader, &mut file).await?;
            file.flush().await?;
            file.sync_all().await?;
            Ok::<u64, std::io::Error>(n)
        }
        .await;

        match written {
            Ok(n) => Ok(n),
            Err(e) => {
                drop(file);
                if let Err(cleanup) = fs::remove_file(&blob_path).await {
                    tracing::warn!(blob = %name, error = %cleanup, "Failed to remove partial blob");
                }
                Err(e.into())
            }
        }
    }

    async fn get_stream(&self, name: &BlobName) -> Result<BoxReader, StorageError> {
        let blob_path = self.blob_path(name);
        match fs::File::open(&blob_path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, name: &BlobName) -> Result<bool, StorageError> {
        let blob_path = self.blob_path(name);
        Ok(fs::try_exists(&blob_path).await?)
    }

    async fn remove(&self, name: &BlobName) -> Result<bool, StorageError> {
        let blob_path = self.blob_path(name);
        match fs::remove_file(&blob_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn size(&self, name: &BlobName) -> Result<u64, StorageError> {
        let blob_path = self.blob_path(name);
        match fs::metadata(&blob_path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<BlobName>, StorageError> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            // Dotfiles and non-UTF-8 names were not written by this store.
            let Ok(file_name) = entry.file_name().into_string() else {
                continue;
            };
            if let Ok(name) = BlobName::parse(file_name) {
                names.push(name);
            }
        }
        names.sort();

        Ok(names)
    }
}
