use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Metadata for one stored image blob.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "image")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Generated storage name; the blob key.
    #[sea_orm(unique)]
    pub filename: String,

    /// Client-supplied name. Display only.
    pub original_filename: String,

    /// Public path, derived from `filename`.
    pub url: String,

    /// Bytes written to the blob store.
    pub file_size: i64,

    pub content_type: String,

    #[sea_orm(indexed)]
    pub upload_timestamp: DateTimeUtc,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
