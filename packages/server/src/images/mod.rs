pub mod memory;
pub mod policy;
pub mod service;
pub mod store;

pub use memory::InMemoryMetadataStore;
pub use policy::{UploadPolicy, UploadRejection};
pub use service::{ImageListing, ImageService, ListParams, UploadRequest};
pub use store::{DeleteOutcome, ImagePage, MetadataStore, NewImage, SeaOrmMetadataStore, StoreError};
