mod error;
mod name;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use filesystem::FilesystemBlobStore;
pub use name::{BlobName, MAX_BLOB_NAME_LEN};
pub use traits::{BlobStore, BoxReader};
