//! Catalog entities returned by the backend.
//!
//! The backend is plain REST CRUD returning JSON documents keyed by `_id`.
//! Only the fields the storefront reads are modelled; anything else in the
//! payload is ignored.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::id::{CategoryId, ProductId};

/// Stock level below which a product counts as low stock.
pub const LOW_STOCK_THRESHOLD: u32 = 10;

/// A product as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id", alias = "id")]
    pub id: ProductId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Units in stock.
    #[serde(default)]
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryRef>,
    /// Whether the product is visible on the storefront.
    #[serde(default = "default_display")]
    pub display: bool,
}

const fn default_display() -> bool {
    true
}

/// A category reference: either populated by the backend or a bare ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Populated(Category),
    Id(CategoryId),
}

impl CategoryRef {
    #[must_use]
    pub const fn id(&self) -> &CategoryId {
        match self {
            Self::Populated(category) => &category.id,
            Self::Id(id) => id,
        }
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id", alias = "id")]
    pub id: CategoryId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Summary figures shown on the dashboard overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProductStats {
    pub total_products: usize,
    /// Estimated as the top decile of the catalog.
    pub top_selling: usize,
    pub low_stock: usize,
    /// Σ price × stock across the catalog.
    pub total_revenue: Decimal,
}

impl ProductStats {
    /// Compute dashboard figures for a seller's products.
    #[must_use]
    pub fn from_products(products: &[Product]) -> Self {
        let total_products = products.len();
        let low_stock = products
            .iter()
            .filter(|p| p.quantity < LOW_STOCK_THRESHOLD)
            .count();
        let total_revenue = products
            .iter()
            .map(|p| p.price * Decimal::from(p.quantity))
            .sum();

        Self {
            total_products,
            top_selling: total_products / 10,
            low_stock,
            total_revenue,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: &str, price: Decimal, quantity: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price,
            quantity,
            image_url: None,
            description: None,
            category: None,
            display: true,
        }
    }

    #[test]
    fn test_product_parses_backend_payload() {
        let json = r#"{
            "_id": "65f1",
            "name": "Tomatoes",
            "price": 2.5,
            "quantity": 40,
            "imageUrl": "uploads/tomato.jpg",
            "category": {"_id": "c1", "name": "Vegetables"},
            "seller": "u9",
            "__v": 0
        }"#;

        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id.as_str(), "65f1");
        assert_eq!(product.price, Decimal::new(25, 1));
        assert_eq!(product.image_url.as_deref(), Some("uploads/tomato.jpg"));
        assert_eq!(product.category.unwrap().id().as_str(), "c1");
        assert!(product.display);
    }

    #[test]
    fn test_product_accepts_bare_category_id() {
        let json = r#"{"_id": "1", "name": "Kale", "price": 3, "category": "c2"}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.category, Some(CategoryRef::Id(CategoryId::new("c2"))));
        assert_eq!(product.quantity, 0);
    }

    #[test]
    fn test_stats_for_empty_catalog() {
        assert_eq!(ProductStats::from_products(&[]), ProductStats::default());
    }

    #[test]
    fn test_stats_figures() {
        let products: Vec<Product> = (0..12)
            .map(|i| product(&i.to_string(), Decimal::new(5, 0), if i < 3 { 2 } else { 20 }))
            .collect();

        let stats = ProductStats::from_products(&products);
        assert_eq!(stats.total_products, 12);
        assert_eq!(stats.top_selling, 1);
        assert_eq!(stats.low_stock, 3);
        // 3 × 5 × 2 + 9 × 5 × 20
        assert_eq!(stats.total_revenue, Decimal::new(930, 0));
    }
}
