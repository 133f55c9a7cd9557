//! Mystery Box Core - Shared domain types.
//!
//! This crate provides the types used across all Mystery Box components:
//! - `storefront` - Storefront state layer (API client, cart, wishlist, catalog)
//! - `cli` - Terminal storefront built on top of the state layer
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no persistence. Catalog entities are read-only projections of the
//! commerce backend; cart totals are server-computed and never derived here.
//!
//! # Modules
//!
//! - [`types`] - Ids, money, products, carts, wishlists, customers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
