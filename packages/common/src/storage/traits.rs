use std::io::Cursor;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::name::BlobName;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Name-keyed blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store an owned buffer under `name` and return the number of bytes
    /// written.
    async fn put_bytes(&self, name: &BlobName, data: Vec<u8>) -> Result<u64, StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data));
        self.put(name, reader).await
    }

    /// Store data from an async reader under `name`.
    ///
    /// Returns the number of bytes actually written. Fails with
    /// [`StorageError::AlreadyExists`] if a blob with this name is present.
    async fn put(&self, name: &BlobName, reader: BoxReader) -> Result<u64, StorageError>;

    /// Retrieve all bytes of a blob.
    async fn get(&self, name: &BlobName) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(name).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve a blob as a streaming async reader.
    async fn get_stream(&self, name: &BlobName) -> Result<BoxReader, StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, name: &BlobName) -> Result<bool, StorageError>;

    /// Remove a blob.
    ///
    /// Returns `true` if the blob was removed, `false` if it did not exist.
    /// A missing blob is not an error.
    async fn remove(&self, name: &BlobName) -> Result<bool, StorageError>;

    /// Get the size of a blob in bytes.
    async fn size(&self, name: &BlobName) -> Result<u64, StorageError>;

    /// List the names of all stored blobs, sorted.
    async fn list(&self) -> Result<Vec<BlobName>, StorageError>;
}
