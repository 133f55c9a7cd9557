//! Cart state container.
//!
//! [`CartStore`] is the only owner of the in-memory cart. Every consumer holds
//! a clone of the same store (or a [`tokio::sync::watch`] receiver from
//! [`CartStore::subscribe`]), so there is exactly one source of truth.
//!
//! Mutations run one at a time in arrival order. Each one resolves the cart
//! id (creating a cart if needed), calls the backend and replaces the cart
//! wholesale with the response. Totals are never computed locally.

mod store;

use mystery_box_core::QuantityError;
use thiserror::Error;

use crate::api::ApiError;
use crate::persistence::PersistenceError;

pub use store::{CartSnapshot, CartStatus, CartStore};

/// Errors raised by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// No cart id is persisted; add an item first.
    #[error("No cart found")]
    NoCart,

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(#[from] QuantityError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
