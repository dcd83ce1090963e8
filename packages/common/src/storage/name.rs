use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::StorageError;

/// Maximum length of a blob name in bytes.
pub const MAX_BLOB_NAME_LEN: usize = 255;

/// A validated blob key.
///
/// A blob name is a single flat path component: it never contains a path
/// separator, never starts with a dot and never contains control characters,
/// so joining it onto the store directory cannot escape that directory.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobName(String);

impl BlobName {
    /// Parse and validate a blob name.
    pub fn parse(name: impl Into<String>) -> Result<Self, StorageError> {
        let name = name.into();

        if name.is_empty() {
            return Err(StorageError::InvalidName("name is empty".into()));
        }
        if name.len() > MAX_BLOB_NAME_LEN {
            return Err(StorageError::InvalidName(format!(
                "name exceeds {MAX_BLOB_NAME_LEN} bytes"
            )));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(StorageError::InvalidName(format!(
                "{name:?} contains a path separator"
            )));
        }
        if name.starts_with('.') {
            return Err(StorageError::InvalidName(format!(
                "{name:?} starts with '.'"
            )));
        }
        if name.chars().any(|c| c.is_control()) {
            return Err(StorageError::InvalidName(
                "name contains control characters".into(),
            ));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for BlobName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BlobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobName({})", self.0)
    }
}

impl fmt::Display for BlobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BlobName {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for BlobName {
    type Error = StorageError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl Serialize for BlobName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BlobName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(s).map_err(serde::de::Error::custom)
    }
}
