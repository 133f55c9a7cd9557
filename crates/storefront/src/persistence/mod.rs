//! Local persistence for cross-session storefront state.
//!
//! A [`KeyValueStore`] holds raw string values; [`Persistence`] is the only
//! type that knows the logical keys and their encodings. Stores receive a
//! `Persistence` handle instead of reaching for keys themselves.
//!
//! # Keys
//!
//! | Key | Value |
//! |-----|-------|
//! | [`keys::CART_ID`] | Server-issued cart id (plain string) |
//! | [`keys::WISHLIST`] | JSON array of `WishlistItem` |
//! | [`keys::CUSTOMER`] | JSON `Customer` of the signed-in shopper |
//! | [`keys::JWT`] | Bearer token for customer endpoints |

mod file;
mod memory;

use std::sync::Arc;

use mystery_box_core::{CartId, Customer, WishlistItem};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Storage keys owned by [`Persistence`].
pub mod keys {
    /// Key for the current cart id.
    pub const CART_ID: &str = "cart_id";

    /// Key for the serialized wishlist.
    pub const WISHLIST: &str = "wishlist";

    /// Key for the signed-in customer.
    pub const CUSTOMER: &str = "customer";

    /// Key for the customer's bearer token.
    pub const JWT: &str = "jwt";
}

/// Errors raised by persistence backends.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Reading or writing the underlying storage failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The key contains characters the backend cannot store.
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// A lock guarding in-process state was poisoned.
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// A string key-value store (the role browser local storage plays on the web).
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;

    /// Delete `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// A signed-in customer together with the token that authenticates them.
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub customer: Customer,
    pub token: SecretString,
}

/// Typed access to the persisted storefront keys.
///
/// Cheaply cloneable; all clones share the same store.
#[derive(Clone)]
pub struct Persistence {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence").finish_non_exhaustive()
    }
}

impl Persistence {
    /// Wrap a key-value store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persistence backed by a fresh in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// The persisted cart id, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn cart_id(&self) -> Result<Option<CartId>, PersistenceError> {
        Ok(self
            .store
            .get(keys::CART_ID)?
            .filter(|id| !id.trim().is_empty())
            .map(CartId::from))
    }

    /// Persist the current cart id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn set_cart_id(&self, cart_id: &CartId) -> Result<(), PersistenceError> {
        self.store.set(keys::CART_ID, cart_id.as_str())
    }

    /// Forget the current cart id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn clear_cart_id(&self) -> Result<(), PersistenceError> {
        self.store.remove(keys::CART_ID)
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    /// The persisted wishlist. A corrupted value reads as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn wishlist(&self) -> Result<Vec<WishlistItem>, PersistenceError> {
        Ok(self.read_json(keys::WISHLIST)?.unwrap_or_default())
    }

    /// Persist the full wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn set_wishlist(&self, items: &[WishlistItem]) -> Result<(), PersistenceError> {
        let encoded = serde_json::to_string(items)?;
        self.store.set(keys::WISHLIST, &encoded)
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// The persisted customer session. Present only when both halves are.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn session(&self) -> Result<Option<StoredSession>, PersistenceError> {
        let customer = self.read_json::<Customer>(keys::CUSTOMER)?;
        let token = self.store.get(keys::JWT)?;

        Ok(match (customer, token) {
            (Some(customer), Some(token)) if !token.is_empty() => Some(StoredSession {
                customer,
                token: SecretString::from(token),
            }),
            _ => None,
        })
    }

    /// Persist a customer session.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn set_session(&self, session: &StoredSession) -> Result<(), PersistenceError> {
        let customer = serde_json::to_string(&session.customer)?;
        self.store.set(keys::CUSTOMER, &customer)?;
        self.store.set(keys::JWT, session.token.expose_secret())
    }

    /// Replace the stored customer, keeping the token.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn set_customer(&self, customer: &Customer) -> Result<(), PersistenceError> {
        let encoded = serde_json::to_string(customer)?;
        self.store.set(keys::CUSTOMER, &encoded)
    }

    /// Remove both halves of the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn clear_session(&self) -> Result<(), PersistenceError> {
        self.store.remove(keys::CUSTOMER)?;
        self.store.remove(keys::JWT)
    }

    fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, PersistenceError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding corrupted persisted value");
                Ok(None)
            }
        }
    }
}
