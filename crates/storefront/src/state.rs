//! Storefront state shared by every page.

use std::sync::Arc;

use mystery_box_core::RegionId;

use crate::account::AccountStore;
use crate::api::{CommerceBackend, CommerceClient};
use crate::cart::CartStore;
use crate::config::StorefrontConfig;
use crate::error::Result;
use crate::persistence::{FileStore, Persistence};
use crate::wishlist::WishlistStore;

/// The storefront's long-lived state: backend client, cart, wishlist and
/// account session.
///
/// Cheaply cloneable via `Arc`; every clone sees the same stores.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    backend: Arc<dyn CommerceBackend>,
    persistence: Persistence,
    cart: CartStore,
    wishlist: WishlistStore,
    account: AccountStore,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Build the storefront against the configured backend, persisting to
    /// `config.data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or persisted state
    /// cannot be read.
    pub fn new(config: StorefrontConfig) -> Result<Self> {
        let client = CommerceClient::new(&config)?;
        let persistence = Persistence::new(Arc::new(FileStore::new(config.data_dir.clone())));
        Self::with_backend(config, Arc::new(client), persistence)
    }

    /// Build the storefront over any backend and store.
    ///
    /// # Errors
    ///
    /// Returns an error if persisted state cannot be read.
    pub fn with_backend(
        config: StorefrontConfig,
        backend: Arc<dyn CommerceBackend>,
        persistence: Persistence,
    ) -> Result<Self> {
        let region_id = config.region_id.clone().map(RegionId::new);
        let cart = CartStore::new(Arc::clone(&backend), persistence.clone(), region_id);
        let wishlist = WishlistStore::load(persistence.clone())?;
        let account = AccountStore::load(Arc::clone(&backend), persistence.clone())?;

        tracing::debug!(
            backend_url = %config.backend_url,
            data_dir = %config.data_dir.display(),
            wishlist_items = wishlist.len(),
            signed_in = account.is_signed_in(),
            "Storefront state loaded"
        );

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                backend,
                persistence,
                cart,
                wishlist,
                account,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The commerce backend, for catalog reads.
    #[must_use]
    pub fn backend(&self) -> &dyn CommerceBackend {
        self.inner.backend.as_ref()
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn wishlist(&self) -> &WishlistStore {
        &self.inner.wishlist
    }

    #[must_use]
    pub fn account(&self) -> &AccountStore {
        &self.inner.account
    }

    #[must_use]
    pub fn persistence(&self) -> &Persistence {
        &self.inner.persistence
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mystery_box_core::{CurrencyCode, VariantId, WishlistItem};
    use url::Url;

    use super::*;
    use crate::api::ProductQuery;
    use crate::test_support::{MockBackend, product};

    fn config() -> StorefrontConfig {
        StorefrontConfig::for_backend(Url::parse("http://localhost:9000").unwrap())
    }

    #[tokio::test]
    async fn test_stores_share_backend_and_persistence() {
        let backend = Arc::new(MockBackend::with_products(vec![product(
            "prod_1",
            "Mystery Box",
            &[("variant_1", 2500)],
        )]));
        let persistence = Persistence::in_memory();
        let storefront =
            Storefront::with_backend(config(), backend.clone(), persistence.clone()).unwrap();

        let cart = storefront
            .cart()
            .add_item(&VariantId::new("variant_1"), 2)
            .await
            .unwrap();
        assert_eq!(persistence.cart_id().unwrap(), Some(cart.id.clone()));

        let products = storefront
            .backend()
            .list_all_products(&ProductQuery::default())
            .await
            .unwrap();
        assert_eq!(products.len(), 1);

        let clone = storefront.clone();
        assert_eq!(clone.cart().item_count(), 2);
    }

    #[tokio::test]
    async fn test_reload_restores_wishlist() {
        let backend = Arc::new(MockBackend::new());
        let persistence = Persistence::in_memory();
        let box_product = product("prod_1", "Mystery Box", &[("variant_1", 2500)]);

        let storefront =
            Storefront::with_backend(config(), backend.clone(), persistence.clone()).unwrap();
        let item = WishlistItem::from_variant(
            &box_product,
            &box_product.variants[0],
            &CurrencyCode::new("usd"),
            chrono::Utc::now(),
        );
        storefront.wishlist().add_item(item).unwrap();

        let reloaded = Storefront::with_backend(config(), backend, persistence).unwrap();
        assert!(
            reloaded
                .wishlist()
                .is_in_wishlist(&VariantId::new("variant_1"))
        );
    }
}
