use thiserror::Error;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// A blob with the same name is already stored.
    #[error("blob already exists: {0}")]
    AlreadyExists(String),

    /// The provided blob name is not a safe storage key.
    #[error("invalid blob name: {0}")]
    InvalidName(String),

    /// An I/O error occurred.
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
}
