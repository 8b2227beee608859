//! Attachment storage port and its Apache OpenDAL implementation.

use std::future::Future;

use ledgerbook_shared::config::{StorageBackend, StorageSettings};
use ledgerbook_shared::types::{AttachmentId, CustomerId};
use opendal::{Operator, services};

use super::error::AttachmentError;
use super::types::{AttachmentRef, NewAttachment};

/// Port for attachment file storage.
///
/// The core never interprets file contents.
pub trait AttachmentStore: Send + Sync {
    /// Store a file owned by one of the customer's records.
    fn store(
        &self,
        customer_id: CustomerId,
        file: NewAttachment,
    ) -> impl Future<Output = Result<AttachmentRef, AttachmentError>> + Send;

    /// Delete a stored file.
    fn delete(
        &self,
        attachment: &AttachmentRef,
    ) -> impl Future<Output = Result<(), AttachmentError>> + Send;
}

/// Attachment store backed by an OpenDAL operator.
#[derive(Clone)]
pub struct OpendalAttachmentStore {
    operator: Operator,
    max_file_size: u64,
}

impl OpendalAttachmentStore {
    /// Create a store from storage settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be initialized.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, AttachmentError> {
        let operator = Self::create_operator(&settings.backend)?;
        Ok(Self {
            operator,
            max_file_size: settings.max_file_size,
        })
    }

    /// Create an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the memory service cannot be initialized.
    pub fn memory(max_file_size: u64) -> Result<Self, AttachmentError> {
        let operator = Self::create_operator(&StorageBackend::Memory)?;
        Ok(Self {
            operator,
            max_file_size,
        })
    }

    fn create_operator(backend: &StorageBackend) -> Result<Operator, AttachmentError> {
        match backend {
            StorageBackend::LocalFs { root } => {
                let root = root
                    .to_str()
                    .ok_or_else(|| AttachmentError::configuration("invalid path"))?;
                let builder = services::Fs::default().root(root);
                Ok(Operator::new(builder)
                    .map_err(|e| AttachmentError::configuration(e.to_string()))?
                    .finish())
            }
            StorageBackend::Memory => {
                let builder = services::Memory::default();
                Ok(Operator::new(builder)
                    .map_err(|e| AttachmentError::configuration(e.to_string()))?
                    .finish())
            }
        }
    }

    /// Check if a file exists in storage.
    #[cfg(test)]
    pub(crate) async fn exists(&self, key: &str) -> Result<bool, AttachmentError> {
        match self.operator.stat(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Read a stored file.
    #[cfg(test)]
    pub(crate) async fn read(
        &self,
        attachment: &AttachmentRef,
    ) -> Result<bytes::Bytes, AttachmentError> {
        let buffer = self.operator.read(&attachment.storage_key).await?;
        Ok(buffer.to_bytes())
    }

    /// Returns the maximum accepted file size in bytes.
    #[must_use]
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }
}

impl AttachmentStore for OpendalAttachmentStore {
    async fn store(
        &self,
        customer_id: CustomerId,
        file: NewAttachment,
    ) -> Result<AttachmentRef, AttachmentError> {
        let size = file.size();
        if size > self.max_file_size {
            return Err(AttachmentError::file_too_large(size, self.max_file_size));
        }
        if file.filename.trim().is_empty() {
            return Err(AttachmentError::InvalidFilename(file.filename));
        }

        let id = AttachmentId::new();
        let key = storage_key(customer_id, id, &file.filename);
        self.operator.write(&key, file.bytes).await?;

        Ok(AttachmentRef {
            id,
            storage_key: key,
            filename: file.filename,
            content_type: file.content_type,
            size,
        })
    }

    async fn delete(&self, attachment: &AttachmentRef) -> Result<(), AttachmentError> {
        self.operator.delete(&attachment.storage_key).await?;
        Ok(())
    }
}

/// Generate the storage key for an attachment.
///
/// Format: `{customer_id}/{attachment_id}/{sanitized_filename}`
#[must_use]
pub fn storage_key(customer_id: CustomerId, attachment_id: AttachmentId, filename: &str) -> String {
    format!(
        "{customer_id}/{attachment_id}/{}",
        sanitize_filename(filename)
    )
}

/// Only ASCII alphanumerics, dots, hyphens and underscores survive.
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
