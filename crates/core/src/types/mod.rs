//! Core types for Shopfront.
//!
//! This module provides type-safe wrappers for the storefront's domain concepts.

pub mod cart;
pub mod id;
pub mod price;
pub mod product;
pub mod role;
pub mod session;

pub use cart::{Cart, CartItem};
pub use id::*;
pub use price::format_price;
pub use product::{Category, Product, ProductStats};
pub use role::{ParseRoleError, Role};
pub use session::{LoginStatus, SessionState};
