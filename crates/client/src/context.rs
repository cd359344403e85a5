//! Application context: the stores one tab needs, wired to cross-tab sync.

use tracing::{error, instrument};

use crate::cart::CartStore;
use crate::guard::NavMenu;
use crate::session::SessionStore;
use crate::storage::{StorageError, StorageEvent, Tab, keys};
use crate::sync::Subscription;

/// Session and cart stores for one tab, kept in step with other tabs.
///
/// Construct one per application instance and hand clones of the stores to
/// whatever needs them. Dropping the context stops cross-tab sync.
pub struct ShopContext {
    session: SessionStore,
    cart: CartStore,
    sync: Subscription,
}

impl ShopContext {
    /// Load both stores from `tab` and start reloading them whenever another
    /// tab or process changes their keys.
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    #[instrument(skip(tab), fields(tab = %tab.id()))]
    pub fn open(tab: Tab) -> Result<Self, StorageError> {
        // Subscribe before the initial load so no change slips in between.
        let session = SessionStore::new(tab.clone());
        let cart = CartStore::new(tab.clone());
        let sync = {
            let session = session.clone();
            let cart = cart.clone();
            tab.on_external_change(move |event| reload(&session, &cart, event))
        };

        session.load()?;
        cart.load()?;

        Ok(Self {
            session,
            cart,
            sync,
        })
    }

    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    #[must_use]
    pub fn tab(&self) -> &Tab {
        self.session.tab()
    }

    /// Navigation bar contents for the current state.
    #[must_use]
    pub fn nav_menu(&self) -> NavMenu {
        NavMenu::for_session(&self.session.snapshot(), self.cart.badge_count())
    }

    /// Whether cross-tab sync is still running.
    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.sync.is_active()
    }

    /// Stop cross-tab sync while keeping the stores usable.
    pub fn detach(self) -> (SessionStore, CartStore) {
        self.sync.unsubscribe();
        (self.session, self.cart)
    }
}

/// Reload whichever stores `event` invalidates.
pub(crate) fn reload(session: &SessionStore, cart: &CartStore, event: &StorageEvent) {
    if (event.affects(keys::LOGGED_IN) || event.affects(keys::ROLE))
        && let Err(e) = session.load()
    {
        error!(error = %e, "Failed to reload session after storage change");
    }
    if event.affects(keys::CART)
        && let Err(e) = cart.load()
    {
        error!(error = %e, "Failed to reload cart after storage change");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use shopfront_core::{CartItem, ProductId, Role, SessionState};

    use super::*;
    use crate::storage::{EventOrigin, StorageArea};

    fn item(id: &str) -> CartItem {
        CartItem {
            id: ProductId::new(id),
            name: id.to_owned(),
            price: rust_decimal::Decimal::ONE,
            quantity: 1,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_other_tab_changes_propagate() {
        let area = StorageArea::in_memory();
        let first = ShopContext::open(area.open_tab()).unwrap();
        let second = ShopContext::open(area.open_tab()).unwrap();
        let mut session_rx = second.session().subscribe();
        let mut cart_rx = second.cart().subscribe();

        first.session().login(Some(Role::Seller)).unwrap();
        first.cart().add_item(item("a")).unwrap();

        tokio::time::timeout(Duration::from_secs(1), async {
            while second.session().snapshot().role != Some(Role::Seller) {
                session_rx.changed().await.unwrap();
            }
            while second.cart().badge_count() != 1 {
                cart_rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap();

        assert_eq!(second.cart().snapshot(), first.cart().snapshot());
        assert_eq!(second.nav_menu().cart_badge, 1);
    }

    #[tokio::test]
    async fn test_reload_twice_is_harmless() {
        let area = StorageArea::in_memory();
        let writer = area.open_tab();
        let ctx = ShopContext::open(area.open_tab()).unwrap();
        let (session, cart) = ctx.detach();

        writer.set_item(keys::LOGGED_IN, "true").unwrap();
        writer.set_item(keys::ROLE, "admin").unwrap();
        let mut persisted = shopfront_core::Cart::new();
        persisted.push(item("x"));
        writer.set_item(keys::CART, &persisted.encode().unwrap()).unwrap();

        let event = StorageEvent::everything(EventOrigin::External);
        reload(&session, &cart, &event);
        let (first_session, first_cart) = (session.snapshot(), cart.snapshot());
        let mut rx = cart.subscribe();
        rx.mark_unchanged();

        reload(&session, &cart, &event);
        assert_eq!(session.snapshot(), first_session);
        assert_eq!(cart.snapshot(), first_cart);
        assert!(!rx.has_changed().unwrap());
        assert_eq!(first_session, SessionState::logged_in(Some(Role::Admin)));
    }

    #[tokio::test]
    async fn test_detach_stops_sync() {
        let area = StorageArea::in_memory();
        let ctx = ShopContext::open(area.open_tab()).unwrap();
        assert!(ctx.is_syncing());

        let (session, _cart) = ctx.detach();
        area.open_tab().set_item(keys::LOGGED_IN, "true").unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!session.snapshot().is_logged_in());
    }
}
