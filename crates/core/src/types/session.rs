//! Session snapshot types.
//!
//! A [`SessionState`] is what navigation, route guards and profile views read
//! to decide what to render.

use crate::types::role::Role;

/// Tri-state login flag.
///
/// `Unknown` means persisted state has not been read yet. Nothing role-gated
/// may be rendered until it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoginStatus {
    #[default]
    Unknown,
    LoggedIn,
    LoggedOut,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SessionState {
    /// Whether a user is authenticated.
    pub status: LoginStatus,
    /// Role of the authenticated user. Only meaningful while logged in.
    pub role: Option<Role>,
}

impl SessionState {
    /// State before persisted storage has been read.
    pub const UNRESOLVED: Self = Self {
        status: LoginStatus::Unknown,
        role: None,
    };

    /// Logged-out state with no role.
    pub const LOGGED_OUT: Self = Self {
        status: LoginStatus::LoggedOut,
        role: None,
    };

    /// Logged-in state with the given role.
    #[must_use]
    pub const fn logged_in(role: Option<Role>) -> Self {
        Self {
            status: LoginStatus::LoggedIn,
            role,
        }
    }

    /// Whether the login flag has been resolved from storage.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        !matches!(self.status, LoginStatus::Unknown)
    }

    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        matches!(self.status, LoginStatus::LoggedIn)
    }

    /// The effective role: `None` unless logged in.
    #[must_use]
    pub const fn active_role(&self) -> Option<Role> {
        if self.is_logged_in() { self.role } else { None }
    }

    /// The role name as persisted, or the empty string when there is none.
    #[must_use]
    pub const fn role_name(&self) -> &'static str {
        match self.active_role() {
            Some(role) => role.as_str(),
            None => "",
        }
    }
}
