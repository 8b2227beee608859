//! Typed IDs for customers, suppliers, ledger entries and their files.
//!
//! Each ID wraps a UUID v7, so a `SupplierId` can never be passed where a
//! `CustomerId` is expected. IDs order by their UUID bytes; for v7 that is
//! creation order, which is what breaks ties between ledger entries created
//! in the same instant.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new time-ordered ID.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

typed_id!(UserId, "Unique identifier for an acting user.");
typed_id!(CustomerId, "Unique identifier for a customer.");
typed_id!(SupplierId, "Unique identifier for a supplier.");
typed_id!(EntryId, "Unique identifier for a ledger entry.");
typed_id!(AttachmentId, "Unique identifier for a stored attachment file.");

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
