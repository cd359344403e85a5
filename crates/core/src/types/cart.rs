//! Shopping cart line items and totals.
//!
//! The cart is client-only state. Its persisted form is a JSON array of
//! [`CartItem`] objects; older payloads that copied the whole product
//! document (`_id`, stock, category, ...) are still readable.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::id::ProductId;
use crate::types::product::Product;

/// A single line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(alias = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Always at least 1.
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl CartItem {
    /// Build a cart line from a catalog product.
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            quantity,
            image_url: product.image_url.clone(),
        }
    }

    /// `price × quantity` for this line.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Ordered cart contents with at most one line per product ID.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Decode a persisted cart.
    ///
    /// Absent, unparseable or non-array payloads decode to an empty cart.
    /// Lines with a zero quantity and repeated IDs are dropped so the
    /// in-memory invariants hold for anything read from storage.
    #[must_use]
    pub fn decode(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::new();
        };
        let Ok(items) = serde_json::from_str::<Vec<CartItem>>(raw) else {
            return Self::new();
        };

        let mut seen = HashSet::new();
        let items = items
            .into_iter()
            .filter(|item| item.quantity >= 1 && seen.insert(item.id.clone()))
            .collect();
        Self { items }
    }

    /// Encode for persistence.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails, which only happens for
    /// prices outside the range of an `f64`.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.items)
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.get(id).is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append a line. Returns `false` and leaves the cart untouched when the
    /// product is already present or `quantity` is zero.
    pub fn push(&mut self, item: CartItem) -> bool {
        if item.quantity == 0 || self.contains(&item.id) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Replace a line's quantity. Returns `false` for zero or unknown IDs.
    pub fn set_quantity(&mut self, id: &ProductId, quantity: u32) -> bool {
        if quantity == 0 {
            return false;
        }
        match self.items.iter_mut().find(|item| &item.id == id) {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove a line. Returns `false` when no line matched.
    pub fn remove(&mut self, id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.id != id);
        self.items.len() != before
    }

    /// Σ `price × quantity` over all lines.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Number shown on the header badge: distinct lines, not units.
    #[must_use]
    pub fn badge_count(&self) -> usize {
        self.items.len()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a CartItem;
    type IntoIter = std::slice::Iter<'a, CartItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
