use thiserror::Error;

use crate::config::UploadConfig;

/// Default upload ceiling: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 10 * 1024 * 1024;

/// Reasons an upload is refused before any bytes are persisted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadRejection {
    #[error("file size {actual} bytes exceeds the {limit} byte limit")]
    TooLarge { actual: u64, limit: u64 },

    #[error("content type '{0}' is not allowed; only JPEG images are accepted")]
    UnsupportedContentType(String),

    #[error("file is empty")]
    Empty,
}

/// Size and content-type policy applied to every upload.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    max_size: u64,
    allowed_content_types: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_UPLOAD_SIZE,
            ["image/jpeg", "image/jpg", "image/pjpeg"],
        )
    }
}

impl UploadPolicy {
    pub fn new<I, S>(max_size: u64, allowed_content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            max_size,
            allowed_content_types: allowed_content_types
                .into_iter()
                .map(|t| normalize_content_type(t.as_ref()))
                .collect(),
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.max_size, &config.allowed_content_types)
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Accept or reject an upload from its declared size and content type.
    pub fn validate(&self, size: u64, content_type: &str) -> Result<(), UploadRejection> {
        self.check_size(size)?;
        if size == 0 {
            return Err(UploadRejection::Empty);
        }
        self.check_content_type(content_type)
    }

    pub fn check_size(&self, size: u64) -> Result<(), UploadRejection> {
        if size > self.max_size {
            return Err(UploadRejection::TooLarge {
                actual: size,
                limit: self.max_size,
            });
        }
        Ok(())
    }

    /// Parameters (`; charset=...`) and case are ignored.
    pub fn check_content_type(&self, content_type: &str) -> Result<(), UploadRejection> {
        let normalized = normalize_content_type(content_type);
        if self.allowed_content_types.contains(&normalized) {
            Ok(())
        } else {
            Err(UploadRejection::UnsupportedContentType(
                content_type.trim().to_string(),
            ))
        }
    }
}

fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
