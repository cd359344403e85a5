//! Cart store: client-only shopping cart persisted under [`keys::CART`].
//!
//! Every mutation is write-through: storage is written first and the
//! in-memory cart is replaced only once the write succeeded, so a tab never
//! diverges from its own writes. Other tabs learn about the change through
//! the storage event and reload.
//!
//! The cart is never synced to the backend. Adding a product that is already
//! in the cart reports [`AddOutcome::AlreadyInCart`] instead of bumping the
//! quantity; revisit that if carts ever become server-side.

use std::sync::{Arc, Mutex, PoisonError};

use rust_decimal::Decimal;
use shopfront_core::{Cart, CartItem, Product, ProductId};
use tokio::sync::watch;
use tracing::{debug, instrument};

use crate::storage::{StorageError, Tab, keys};

/// Result of adding a line to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// The product already has a line; nothing changed.
    AlreadyInCart,
    /// Quantity was zero; nothing changed.
    InvalidQuantity,
}

/// Result of changing a line's quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityOutcome {
    Updated,
    /// Quantity below 1; nothing changed.
    Rejected,
    /// No line for that product; nothing changed.
    NotFound,
}

/// Shared cart state for one tab.
///
/// Cheaply cloneable; clones share the same state.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    tab: Tab,
    state: watch::Sender<Cart>,
    /// Serializes read-modify-write cycles against `state` and storage.
    write_lock: Mutex<()>,
}

impl CartStore {
    /// Create a store with an empty cart. Call [`load`](Self::load) to read
    /// the persisted cart.
    #[must_use]
    pub fn new(tab: Tab) -> Self {
        Self {
            inner: Arc::new(CartStoreInner {
                tab,
                state: watch::Sender::new(Cart::new()),
                write_lock: Mutex::new(()),
            }),
        }
    }

    /// Create a store and load the persisted cart.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub fn open(tab: Tab) -> Result<Self, StorageError> {
        let store = Self::new(tab);
        store.load()?;
        Ok(store)
    }

    /// Re-read the cart from storage.
    ///
    /// Missing or unreadable payloads load as an empty cart.
    ///
    /// # Errors
    ///
    /// Returns an error only if storage itself cannot be read.
    #[instrument(skip(self), fields(tab = %self.inner.tab.id()))]
    pub fn load(&self) -> Result<(), StorageError> {
        let _guard = self.lock();
        let raw = self.inner.tab.get_item(keys::CART)?;
        let cart = Cart::decode(raw.as_deref());

        if cart.is_empty()
            && let Some(raw) = raw.as_deref()
            && raw.trim() != "[]"
        {
            debug!("Persisted cart unreadable, using an empty cart");
        }

        self.inner.state.send_if_modified(|current| {
            if *current == cart {
                return false;
            }
            *current = cart;
            true
        });
        Ok(())
    }

    /// Add one unit of a catalog product.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub fn add_product(&self, product: &Product) -> Result<AddOutcome, StorageError> {
        self.add_item(CartItem::from_product(product, 1))
    }

    /// Append a line unless the product is already in the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted; the cart is left
    /// unchanged.
    #[instrument(skip(self, item), fields(tab = %self.inner.tab.id(), product = %item.id))]
    pub fn add_item(&self, item: CartItem) -> Result<AddOutcome, StorageError> {
        self.mutate(|cart| {
            if item.quantity == 0 {
                return (false, AddOutcome::InvalidQuantity);
            }
            if cart.contains(&item.id) {
                return (false, AddOutcome::AlreadyInCart);
            }
            cart.push(item);
            (true, AddOutcome::Added)
        })
    }

    /// Replace a line's quantity. Quantities below 1 are rejected rather
    /// than removing the line.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted; the cart is left
    /// unchanged.
    #[instrument(skip(self), fields(tab = %self.inner.tab.id()))]
    pub fn set_quantity(
        &self,
        id: &ProductId,
        quantity: u32,
    ) -> Result<QuantityOutcome, StorageError> {
        self.adjust_quantity(id, |_| quantity)
    }

    /// Add one unit to a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    #[instrument(skip(self), fields(tab = %self.inner.tab.id()))]
    pub fn increment(&self, id: &ProductId) -> Result<QuantityOutcome, StorageError> {
        self.adjust_quantity(id, |quantity| quantity.saturating_add(1))
    }

    /// Take one unit off a line. A line at 1 stays at 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    #[instrument(skip(self), fields(tab = %self.inner.tab.id()))]
    pub fn decrement(&self, id: &ProductId) -> Result<QuantityOutcome, StorageError> {
        self.adjust_quantity(id, |quantity| quantity.saturating_sub(1))
    }

    /// Remove a line. Returns whether one was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted; the cart is left
    /// unchanged.
    #[instrument(skip(self), fields(tab = %self.inner.tab.id()))]
    pub fn remove_item(&self, id: &ProductId) -> Result<bool, StorageError> {
        self.mutate(|cart| {
            let removed = cart.remove(id);
            (removed, removed)
        })
    }

    /// Empty the cart. Always persists, which also replaces an unreadable
    /// payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    #[instrument(skip(self), fields(tab = %self.inner.tab.id()))]
    pub fn clear(&self) -> Result<(), StorageError> {
        self.mutate(|cart| {
            *cart = Cart::new();
            (true, ())
        })
    }

    /// Σ `price × quantity`, computed from the current cart on every call.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.inner.state.borrow().subtotal()
    }

    /// Header badge count: number of distinct lines.
    #[must_use]
    pub fn badge_count(&self) -> usize {
        self.inner.state.borrow().badge_count()
    }

    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.inner.state.borrow().total_quantity()
    }

    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.inner.state.borrow().contains(id)
    }

    /// Current cart snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Cart {
        self.inner.state.borrow().clone()
    }

    /// Receiver that is marked changed whenever the cart changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn tab(&self) -> &Tab {
        &self.inner.tab
    }

    /// Derive a line's new quantity from its current one under the write
    /// lock. Results below 1 are rejected.
    fn adjust_quantity(
        &self,
        id: &ProductId,
        next: impl FnOnce(u32) -> u32,
    ) -> Result<QuantityOutcome, StorageError> {
        self.mutate(|cart| {
            let Some(current) = cart.get(id).map(|item| item.quantity) else {
                return (false, QuantityOutcome::NotFound);
            };
            let quantity = next(current);
            if quantity < 1 {
                return (false, QuantityOutcome::Rejected);
            }
            (cart.set_quantity(id, quantity), QuantityOutcome::Updated)
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.inner
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change` to a copy of the cart; when it reports a change,
    /// persist the copy and then publish it.
    fn mutate<T>(&self, change: impl FnOnce(&mut Cart) -> (bool, T)) -> Result<T, StorageError> {
        let _guard = self.lock();
        let mut next = self.snapshot();
        let (changed, outcome) = change(&mut next);

        if changed {
            self.inner.tab.set_item(keys::CART, &next.encode()?)?;
            self.inner.state.send_if_modified(|current| {
                if *current == next {
                    return false;
                }
                *current = next;
                true
            });
        }
        Ok(outcome)
    }
}
