//! Shopfront client library.
//!
//! Client-side state for the Shopfront storefront and dashboard:
//!
//! - [`storage`] - Durable key/value storage shared by every open tab
//! - [`sync`] - Cross-tab change feeds and subscriptions
//! - [`session`] - Login status and role
//! - [`cart`] - Shopping cart with write-through persistence
//! - [`guard`] - Role-gated routes and navigation menu
//! - [`context`] - Per-tab application context wiring the stores together
//! - [`api`] - REST backend client
//! - [`auth`] - Sign-in, sign-out and password reset flows
//! - [`checkout`] - Emptying the cart after a confirmed payment
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn demo() -> shopfront_client::error::Result<()> {
//! use shopfront_client::{ShopContext, StorageArea};
//!
//! let area = StorageArea::in_memory();
//! let ctx = ShopContext::open(area.open_tab())?;
//! ctx.session().login(None)?;
//! assert_eq!(ctx.nav_menu().cart_badge, 0);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod session;
pub mod storage;
pub mod sync;

pub use api::{ApiClient, ApiError};
pub use cart::{AddOutcome, CartStore, QuantityOutcome};
pub use checkout::CheckoutOutcome;
pub use config::ClientConfig;
pub use context::ShopContext;
pub use error::ClientError;
pub use guard::{GuardDecision, NavMenu, Navigation, Route, RouteGuard};
pub use session::SessionStore;
pub use storage::{StorageArea, StorageError, StorageEvent, Tab};
pub use sync::{ChangeFeed, Subscription};
