//! Account roles issued by the backend.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role attached to a logged-in session.
///
/// Persisted and exchanged with the backend as its lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Shopper with access to the storefront, cart and profile.
    #[default]
    User,
    /// Merchant who manages their own products from the dashboard.
    Seller,
    /// Full access to the dashboard including user management.
    Admin,
}

impl Role {
    /// Every role, in ascending order of privilege.
    pub const ALL: [Self; 3] = [Self::User, Self::Seller, Self::Admin];

    /// The persisted name of this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Seller => "seller",
            Self::Admin => "admin",
        }
    }

    /// Whether this role may open the seller/admin dashboard.
    #[must_use]
    pub const fn has_dashboard(self) -> bool {
        matches!(self, Self::Seller | Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known [`Role`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid role: {0}")]
pub struct ParseRoleError(pub String);

impl std::str::FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "seller" => Ok(Self::Seller),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseRoleError(s.to_owned())),
        }
    }
}
