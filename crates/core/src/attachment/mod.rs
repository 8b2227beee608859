//! Attachment file storage.
//!
//! Attachment files are owned by exactly one ledger entry or staged proposal.
//! The ledger service stores them through the [`AttachmentStore`] port and
//! deletes them when their owner goes away.

mod error;
mod service;
mod types;

pub use error::AttachmentError;
pub use service::{AttachmentStore, OpendalAttachmentStore, storage_key};
pub use types::{AttachmentRef, NewAttachment};
