//! Role-gated routing and navigation.
//!
//! Guards are synchronous checks against a [`SessionState`] snapshot and are
//! meant to be re-evaluated on every navigation.

use shopfront_core::{Role, SessionState};

/// Where denied navigations are sent.
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// Outcome of checking a session against a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render the protected content.
    Allow,
    /// Session not resolved yet: render a neutral placeholder.
    Pending,
    /// Navigate elsewhere instead of rendering.
    Redirect(&'static str),
}

/// Requires a logged-in session whose role is in a permitted set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteGuard {
    permitted: &'static [Role],
    redirect_to: &'static str,
}

impl RouteGuard {
    /// Permit any of `roles`; deny everyone else to [`UNAUTHORIZED_PATH`].
    #[must_use]
    pub const fn require(roles: &'static [Role]) -> Self {
        Self {
            permitted: roles,
            redirect_to: UNAUTHORIZED_PATH,
        }
    }

    /// Permit any logged-in role.
    #[must_use]
    pub const fn logged_in() -> Self {
        Self::require(&Role::ALL)
    }

    /// Redirect denied sessions somewhere other than the default.
    #[must_use]
    pub const fn redirect_to(mut self, path: &'static str) -> Self {
        self.redirect_to = path;
        self
    }

    #[must_use]
    pub const fn permitted(&self) -> &'static [Role] {
        self.permitted
    }

    #[must_use]
    pub fn check(&self, session: &SessionState) -> GuardDecision {
        if !session.is_resolved() {
            return GuardDecision::Pending;
        }
        match session.active_role() {
            Some(role) if self.permitted.contains(&role) => GuardDecision::Allow,
            _ => GuardDecision::Redirect(self.redirect_to),
        }
    }
}

const DASHBOARD_ROLES: &[Role] = &[Role::Seller, Role::Admin];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Pages of the storefront and dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Register,
    Cart,
    Profile,
    CheckoutSuccess,
    Unauthorized,
    DashboardOverview,
    DashboardProducts,
    DashboardUsers,
    DashboardOrders,
    DashboardAnalytics,
    DashboardSettings,
    DashboardCategories,
}

impl Route {
    /// Every route, storefront first.
    pub const ALL: [Self; 14] = [
        Self::Home,
        Self::Login,
        Self::Register,
        Self::Cart,
        Self::Profile,
        Self::CheckoutSuccess,
        Self::Unauthorized,
        Self::DashboardOverview,
        Self::DashboardProducts,
        Self::DashboardUsers,
        Self::DashboardOrders,
        Self::DashboardAnalytics,
        Self::DashboardSettings,
        Self::DashboardCategories,
    ];

    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Login => "/login",
            Self::Register => "/register",
            Self::Cart => "/cart",
            Self::Profile => "/profile",
            Self::CheckoutSuccess => "/checkout/success",
            Self::Unauthorized => UNAUTHORIZED_PATH,
            Self::DashboardOverview => "/dashboard",
            Self::DashboardProducts => "/dashboard/products",
            Self::DashboardUsers => "/dashboard/users",
            Self::DashboardOrders => "/dashboard/orders",
            Self::DashboardAnalytics => "/dashboard/analytics",
            Self::DashboardSettings => "/dashboard/settings",
            Self::DashboardCategories => "/dashboard/categories",
        }
    }

    /// Resolve a path, ignoring a trailing slash, query string or fragment.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        Self::ALL.into_iter().find(|route| route.path() == path)
    }

    /// The guard protecting this route, if any.
    #[must_use]
    pub const fn guard(self) -> Option<RouteGuard> {
        match self {
            Self::Home
            | Self::Login
            | Self::Register
            | Self::Cart
            | Self::CheckoutSuccess
            | Self::Unauthorized => None,
            Self::Profile => Some(RouteGuard::logged_in().redirect_to("/login")),
            Self::DashboardUsers => Some(RouteGuard::require(ADMIN_ONLY)),
            Self::DashboardOverview
            | Self::DashboardProducts
            | Self::DashboardOrders
            | Self::DashboardAnalytics
            | Self::DashboardSettings
            | Self::DashboardCategories => Some(RouteGuard::require(DASHBOARD_ROLES)),
        }
    }
}

/// Result of navigating to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    /// Session still resolving; show a neutral view of the route.
    Pending(Route),
    Redirect(&'static str),
    NotFound,
}

/// Check `path` against its route's guard.
#[must_use]
pub fn navigate(path: &str, session: &SessionState) -> Navigation {
    let Some(route) = Route::from_path(path) else {
        return Navigation::NotFound;
    };
    match route.guard().map(|guard| guard.check(session)) {
        None | Some(GuardDecision::Allow) => Navigation::Render(route),
        Some(GuardDecision::Pending) => Navigation::Pending(route),
        Some(GuardDecision::Redirect(to)) => Navigation::Redirect(to),
    }
}

/// A link shown in the navigation bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavLink {
    Route(Route),
    Logout,
}

/// Navigation bar contents for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavMenu {
    pub links: Vec<NavLink>,
    pub cart_badge: usize,
}

impl NavMenu {
    /// Links for `session`. While the session is unresolved only neutral
    /// links are produced.
    #[must_use]
    pub fn for_session(session: &SessionState, cart_badge: usize) -> Self {
        let mut links = vec![NavLink::Route(Route::Home), NavLink::Route(Route::Cart)];

        if session.is_resolved() {
            if session.is_logged_in() {
                match session.active_role() {
                    Some(role) if role.has_dashboard() => {
                        links.push(NavLink::Route(Route::DashboardOverview));
                    }
                    Some(_) => links.push(NavLink::Route(Route::Profile)),
                    None => {}
                }
                links.push(NavLink::Logout);
            } else {
                links.push(NavLink::Route(Route::Login));
                links.push(NavLink::Route(Route::Register));
            }
        }

        Self { links, cart_badge }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: SessionState = SessionState {
        status: shopfront_core::LoginStatus::LoggedIn,
        role: Some(Role::Admin),
    };
    const USER: SessionState = SessionState {
        status: shopfront_core::LoginStatus::LoggedIn,
        role: Some(Role::User),
    };

    #[test]
    fn test_admin_guard() {
        let guard = RouteGuard::require(ADMIN_ONLY);
        assert_eq!(guard.check(&ADMIN), GuardDecision::Allow);
        assert_eq!(
            guard.check(&USER),
            GuardDecision::Redirect(UNAUTHORIZED_PATH)
        );
        assert_eq!(
            guard.check(&SessionState::LOGGED_OUT),
            GuardDecision::Redirect(UNAUTHORIZED_PATH)
        );
        assert_eq!(
            guard.check(&SessionState::UNRESOLVED),
            GuardDecision::Pending
        );
    }

    #[test]
    fn test_logged_in_without_role_is_denied() {
        let guard = RouteGuard::logged_in();
        assert_eq!(
            guard.check(&SessionState::logged_in(None)),
            GuardDecision::Redirect(UNAUTHORIZED_PATH)
        );
    }

    #[test]
    fn test_route_from_path() {
        assert_eq!(Route::from_path("/"), Some(Route::Home));
        assert_eq!(Route::from_path(""), Some(Route::Home));
        assert_eq!(Route::from_path("/cart/"), Some(Route::Cart));
        assert_eq!(
            Route::from_path("/dashboard/users?page=2"),
            Some(Route::DashboardUsers)
        );
        assert_eq!(Route::from_path("/nowhere"), None);
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
    }

    #[test]
    fn test_navigate_dashboard() {
        let seller = SessionState::logged_in(Some(Role::Seller));
        assert_eq!(
            navigate("/dashboard/products", &seller),
            Navigation::Render(Route::DashboardProducts)
        );
        assert_eq!(
            navigate("/dashboard/users", &seller),
            Navigation::Redirect(UNAUTHORIZED_PATH)
        );
        assert_eq!(
            navigate("/dashboard", &USER),
            Navigation::Redirect(UNAUTHORIZED_PATH)
        );
        assert_eq!(
            navigate("/dashboard", &SessionState::UNRESOLVED),
            Navigation::Pending(Route::DashboardOverview)
        );
    }

    #[test]
    fn test_navigate_public_and_profile() {
        assert_eq!(
            navigate("/cart", &SessionState::UNRESOLVED),
            Navigation::Render(Route::Cart)
        );
        assert_eq!(
            navigate("/profile", &SessionState::LOGGED_OUT),
            Navigation::Redirect("/login")
        );
        assert_eq!(navigate("/profile", &USER), Navigation::Render(Route::Profile));
        assert_eq!(navigate("/admin", &ADMIN), Navigation::NotFound);
    }

    #[test]
    fn test_menu_is_neutral_while_unresolved() {
        let menu = NavMenu::for_session(&SessionState::UNRESOLVED, 3);
        assert_eq!(
            menu.links,
            vec![NavLink::Route(Route::Home), NavLink::Route(Route::Cart)]
        );
        assert_eq!(menu.cart_badge, 3);
    }

    #[test]
    fn test_menu_per_role() {
        let logged_out = NavMenu::for_session(&SessionState::LOGGED_OUT, 0);
        assert!(logged_out.links.contains(&NavLink::Route(Route::Login)));
        assert!(!logged_out.links.contains(&NavLink::Logout));

        let user = NavMenu::for_session(&USER, 0);
        assert!(user.links.contains(&NavLink::Route(Route::Profile)));
        assert!(!user.links.contains(&NavLink::Route(Route::DashboardOverview)));
        assert!(user.links.contains(&NavLink::Logout));

        let admin = NavMenu::for_session(&ADMIN, 0);
        assert!(admin.links.contains(&NavLink::Route(Route::DashboardOverview)));
        assert!(!admin.links.contains(&NavLink::Route(Route::Profile)));
    }
}
