//! Wishlist state container.
//!
//! The wishlist never touches the backend. It is loaded from [`Persistence`]
//! once and written through on every change.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mystery_box_core::{Cart, VariantId, WishlistItem};
use thiserror::Error;
use tracing::instrument;

use crate::cart::{CartError, CartStore};
use crate::error::add_breadcrumb;
use crate::persistence::{Persistence, PersistenceError};

/// Errors raised by wishlist operations.
#[derive(Debug, Error)]
pub enum WishlistError {
    #[error("Variant {0} is not in the wishlist")]
    NotInWishlist(VariantId),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Cart(#[from] CartError),
}

/// Saved variants, unique by variant id, in the order they were first added.
#[derive(Clone)]
pub struct WishlistStore {
    inner: Arc<WishlistInner>,
}

struct WishlistInner {
    persistence: Persistence,
    items: Mutex<Vec<WishlistItem>>,
}

impl std::fmt::Debug for WishlistStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WishlistStore")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl WishlistStore {
    /// Load the persisted wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn load(persistence: Persistence) -> Result<Self, PersistenceError> {
        let items = persistence.wishlist()?;
        tracing::debug!(count = items.len(), "Loaded wishlist");
        Ok(Self {
            inner: Arc::new(WishlistInner {
                persistence,
                items: Mutex::new(items),
            }),
        })
    }

    /// A copy of the current entries.
    #[must_use]
    pub fn items(&self) -> Vec<WishlistItem> {
        self.lock().clone()
    }

    #[must_use]
    pub fn is_in_wishlist(&self, variant_id: &VariantId) -> bool {
        self.lock().iter().any(|i| &i.variant_id == variant_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Insert `item`, replacing any entry for the same variant in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the wishlist cannot be persisted; the in-memory
    /// list is left unchanged in that case.
    #[instrument(skip_all, fields(variant_id = %item.variant_id))]
    pub fn add_item(&self, item: WishlistItem) -> Result<(), WishlistError> {
        add_breadcrumb(
            "wishlist",
            "Add item",
            Some(&[("variant_id", item.variant_id.as_str())]),
        );
        self.update(|items| {
            match items.iter_mut().find(|i| i.variant_id == item.variant_id) {
                Some(existing) => *existing = item,
                None => items.push(item),
            }
            true
        })
    }

    /// Remove the entry for `variant_id`. Returns whether one was removed;
    /// removing an absent variant is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the wishlist cannot be persisted.
    #[instrument(skip(self))]
    pub fn remove_item(&self, variant_id: &VariantId) -> Result<bool, WishlistError> {
        let mut removed = false;
        self.update(|items| {
            let before = items.len();
            items.retain(|i| &i.variant_id != variant_id);
            removed = items.len() != before;
            removed
        })?;
        Ok(removed)
    }

    /// Remove every entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the wishlist cannot be persisted.
    #[instrument(skip(self))]
    pub fn clear_wishlist(&self) -> Result<(), WishlistError> {
        self.update(|items| {
            items.clear();
            true
        })
    }

    /// Add one unit of the variant to the cart, then drop it from the wishlist.
    ///
    /// The two steps are independent: if the cart add fails the wishlist is
    /// untouched, and if the wishlist write fails the item stays in the cart.
    ///
    /// # Errors
    ///
    /// Returns `NotInWishlist` if the variant is not saved, otherwise the
    /// failure of whichever step failed.
    #[instrument(skip(self, cart))]
    pub async fn move_to_cart(
        &self,
        variant_id: &VariantId,
        cart: &CartStore,
    ) -> Result<Cart, WishlistError> {
        if !self.is_in_wishlist(variant_id) {
            return Err(WishlistError::NotInWishlist(variant_id.clone()));
        }

        let updated = cart.add_item(variant_id, 1).await?;
        self.remove_item(variant_id)?;
        Ok(updated)
    }

    /// Apply `change` to a copy of the list and commit it once persisted.
    /// `change` returns whether anything changed; no write happens otherwise.
    fn update(&self, change: impl FnOnce(&mut Vec<WishlistItem>) -> bool) -> Result<(), WishlistError> {
        let mut items = self.lock();
        let mut next = items.clone();
        if !change(&mut next) {
            return Ok(());
        }
        self.inner.persistence.set_wishlist(&next)?;
        *items = next;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<WishlistItem>> {
        self.inner
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
