//! Actor identity and role as resolved by the authentication collaborator.

use ledgerbook_shared::types::{CustomerId, UserId};
use serde::{Deserialize, Serialize};

/// Actor class for ledger mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    /// Can only propose creations and edits for their own customer.
    Standard,
    /// Can mutate directly and approve or reject proposals.
    Privileged,
}

impl ActorRole {
    /// Parse a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "standard" => Some(Self::Standard),
            "privileged" => Some(Self::Privileged),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Privileged => "privileged",
        }
    }
}

impl std::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The resolved identity behind a ledger request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// The acting user.
    pub user_id: UserId,
    /// The customer the actor is bound to, if any.
    pub customer_id: Option<CustomerId>,
    /// The actor's role.
    pub role: ActorRole,
}

impl Actor {
    /// A privileged actor not bound to a customer.
    #[must_use]
    pub fn privileged(user_id: UserId) -> Self {
        Self {
            user_id,
            customer_id: None,
            role: ActorRole::Privileged,
        }
    }

    /// A standard actor bound to one customer.
    #[must_use]
    pub fn standard(user_id: UserId, customer_id: CustomerId) -> Self {
        Self {
            user_id,
            customer_id: Some(customer_id),
            role: ActorRole::Standard,
        }
    }

    /// Returns true for privileged actors.
    #[must_use]
    pub fn is_privileged(&self) -> bool {
        self.role == ActorRole::Privileged
    }

    /// Returns true if the actor may submit changes for the customer's ledger.
    ///
    /// Privileged actors may act for every customer; standard actors only for
    /// the customer they are bound to.
    #[must_use]
    pub fn can_act_for(&self, customer_id: CustomerId) -> bool {
        self.is_privileged() || self.customer_id == Some(customer_id)
    }
}
