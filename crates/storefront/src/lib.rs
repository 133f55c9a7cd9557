//! Mystery Box storefront state layer.
//!
//! Everything a storefront UI needs below the presentation layer: a client
//! for the commerce backend, a serialized cart container, a locally persisted
//! wishlist, the customer session, and the client-side catalog pipeline
//! (search, filter, sort, paginate).
//!
//! [`Storefront`] wires the pieces together from a [`StorefrontConfig`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod account;
pub mod api;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod persistence;
pub mod state;
pub mod wishlist;

#[cfg(test)]
mod test_support;

pub use config::StorefrontConfig;
pub use error::{AppError, ErrorKind};
pub use state::Storefront;
