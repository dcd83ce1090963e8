use chrono::Utc;
use rand::TryRngCore;
use rand::rngs::OsRng;
use thiserror::Error;

/// Number of random bytes in a generated storage name.
pub const RANDOM_BYTES: usize = 8;

/// Longest extension carried over from an original filename, without the dot.
const MAX_EXTENSION_LEN: usize = 16;

/// Result of validating a flat filename.
#[derive(Debug)]
pub enum FilenameError {
    /// Filename is empty or whitespace-only.
    Empty,
    /// Filename contains path separators (`/` or `\`).
    ContainsPathSeparator,
    /// Filename contains path traversal patterns (`..`).
    PathTraversal,
    /// Filename contains null bytes.
    NullByte,
    /// Filename starts with a dot (hidden file).
    Hidden,
    /// Filename contains control characters (CR, LF, etc.).
    ControlCharacter,
}

impl FilenameError {
    /// Returns a human-readable error message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "Filename cannot be empty",
            Self::ContainsPathSeparator => "Invalid filename: path separators are not allowed",
            Self::PathTraversal => "Invalid filename: '..' is not allowed",
            Self::NullByte => "Invalid filename: null bytes are not allowed",
            Self::Hidden => "Invalid filename: hidden files (starting with '.') are not allowed",
            Self::ControlCharacter => "Invalid filename: control characters are not allowed",
        }
    }
}

/// The operating system's random source could not be read.
#[derive(Debug, Error)]
#[error("random source unavailable: {0}")]
pub struct RandomSourceError(String);

/// Validates a flat filename (no directory components allowed).
pub fn validate_flat_filename(filename: &str) -> Result<&str, FilenameError> {
    let trimmed = filename.trim();

    if trimmed.is_empty() {
        return Err(FilenameError::Empty);
    }

    if trimmed.contains('\0') {
        return Err(FilenameError::NullByte);
    }

    // Reject ASCII control characters to prevent
    // HTTP header injection (e.g. CRLF in Content-Disposition).
    if trimmed.chars().any(|c| c.is_ascii_control()) {
        return Err(FilenameError::ControlCharacter);
    }

    if trimmed.contains('/') || trimmed.contains('\\') {
        return Err(FilenameError::ContainsPathSeparator);
    }

    if trimmed == ".." {
        return Err(FilenameError::PathTraversal);
    }

    if trimmed.starts_with('.') {
        return Err(FilenameError::Hidden);
    }

    Ok(trimmed)
}

/// Extension of the final path component, including the leading dot.
///
/// Case is preserved. Extensions that are not short ASCII alphanumerics are
/// dropped, so the result is always safe to embed in a storage key.
pub fn extension_of(filename: &str) -> Option<&str> {
    let last = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let dot = last.rfind('.')?;
    let ext = &last[dot + 1..];

    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }

    Some(&last[dot..])
}

/// Build a storage name of the form `{unix_ts}_{16 hex chars}{ext}`.
pub fn generate_storage_name_at(original: &str, unix_ts: i64, random: [u8; RANDOM_BYTES]) -> String {
    format!(
        "{unix_ts}_{}{}",
        hex::encode(random),
        extension_of(original).unwrap_or_default()
    )
}

/// Generate a collision-resistant storage name for an uploaded file, using
/// the current time and bytes from the OS CSPRNG.
pub fn generate_storage_name(original: &str) -> Result<String, RandomSourceError> {
    let mut random = [0u8; RANDOM_BYTES];
    OsRng
        .try_fill_bytes(&mut random)
        .map_err(|e| RandomSourceError(e.to_string()))?;

    Ok(generate_storage_name_at(
        original,
        Utc::now().timestamp(),
        random,
    ))
}
