//! Attachment types.

use bytes::Bytes;
use ledgerbook_shared::types::AttachmentId;
use serde::{Deserialize, Serialize};

/// Reference to a stored attachment file.
///
/// Persisted alongside the entry or proposal that owns the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// Attachment ID.
    pub id: AttachmentId,
    /// Key of the file in the storage backend.
    pub storage_key: String,
    /// Original filename.
    pub filename: String,
    /// MIME type.
    pub content_type: String,
    /// File size in bytes.
    pub size: u64,
}

/// A file submitted with a creation or edit request.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    /// Original filename.
    pub filename: String,
    /// MIME type.
    pub content_type: String,
    /// File contents.
    pub bytes: Bytes,
}

impl NewAttachment {
    /// Create a new attachment upload.
    #[must_use]
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Size of the contents in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}
