//! Shopfront Core - Shared types library.
//!
//! This crate provides the types shared by every Shopfront component:
//! - `client` - Session and cart stores, cross-tab sync, REST backend client
//! - `cli` - Command-line tab over durable storage
//!
//! # Architecture
//!
//! The core crate contains only types and pure computations - no I/O, no
//! storage access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Roles, session snapshots, cart line items, catalog entities and prices

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
