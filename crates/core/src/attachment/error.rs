//! Attachment error types.

use thiserror::Error;

/// Attachment storage errors.
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// File size exceeds the configured maximum.
    #[error("file too large: {size} bytes exceeds maximum {max} bytes")]
    FileTooLarge {
        /// Actual file size.
        size: u64,
        /// Maximum allowed size.
        max: u64,
    },

    /// Filename is empty after sanitizing.
    #[error("invalid attachment filename: {0:?}")]
    InvalidFilename(String),

    /// File not found in storage.
    #[error("attachment not found: {key}")]
    NotFound {
        /// Storage key that was not found.
        key: String,
    },

    /// Storage backend configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// OpenDAL operation error.
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl AttachmentError {
    /// Create a file too large error.
    #[must_use]
    pub fn file_too_large(size: u64, max: u64) -> Self {
        Self::FileTooLarge { size, max }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

impl From<opendal::Error> for AttachmentError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound {
                key: err.to_string(),
            },
            _ => Self::Operation(err.to_string()),
        }
    }
}
