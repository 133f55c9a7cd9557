use std::future::Future;
use std::sync::Arc;

use mystery_box_core::{Cart, CartId, LineItemId, Quantity, RegionId, VariantId};
use tokio::sync::{Mutex, watch};
use tracing::instrument;

use super::CartError;
use crate::api::CommerceBackend;
use crate::error::add_breadcrumb;
use crate::persistence::Persistence;

/// Lifecycle of the cart store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CartStatus {
    /// Nothing has been loaded yet.
    #[default]
    Uninitialized,
    /// An operation is in flight.
    Loading,
    /// The last operation succeeded.
    Ready,
    /// The last operation failed. Further operations may still be attempted.
    Error,
}

/// Point-in-time view of the cart store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartSnapshot {
    pub status: CartStatus,
    /// The latest cart returned by the backend. Kept across loading and error states.
    pub cart: Option<Cart>,
    /// Message of the last failure, cleared on the next success.
    pub error: Option<String>,
}

impl CartSnapshot {
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.status, CartStatus::Loading)
    }

    /// Units across all lines, zero without a cart.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.cart.as_ref().map_or(0, Cart::item_count)
    }
}

/// The cart state container.
///
/// Cheaply cloneable; clones share state and the mutation queue.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    backend: Arc<dyn CommerceBackend>,
    persistence: Persistence,
    region_id: Option<RegionId>,
    /// Held for the whole of each mutation. Tokio's mutex is fair, so waiters
    /// run in the order they arrived.
    queue: Mutex<()>,
    snapshot: watch::Sender<CartSnapshot>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("snapshot", &*self.inner.snapshot.borrow())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Create a store. Nothing is fetched until [`initialize`](Self::initialize)
    /// or the first mutation.
    #[must_use]
    pub fn new(
        backend: Arc<dyn CommerceBackend>,
        persistence: Persistence,
        region_id: Option<RegionId>,
    ) -> Self {
        let (snapshot, _) = watch::channel(CartSnapshot::default());
        Self {
            inner: Arc::new(CartStoreInner {
                backend,
                persistence,
                region_id,
                queue: Mutex::new(()),
                snapshot,
            }),
        }
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    /// The current state.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Receive every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// The current cart, if one has been loaded.
    #[must_use]
    pub fn cart(&self) -> Option<Cart> {
        self.inner.snapshot.borrow().cart.clone()
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.inner.snapshot.borrow().item_count()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Load the persisted cart, if any.
    ///
    /// A persisted id the backend no longer knows is forgotten; the next
    /// [`add_item`](Self::add_item) creates a fresh cart.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails or the backend is unreachable.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<Option<Cart>, CartError> {
        let _turn = self.inner.queue.lock().await;
        self.set_loading();

        let result: Result<Option<Cart>, CartError> = async {
            let Some(cart_id) = self.inner.persistence.cart_id()? else {
                return Ok(None);
            };
            match self.inner.backend.get_cart(&cart_id).await {
                Ok(cart) => Ok(Some(cart)),
                Err(e) if e.is_not_found() => {
                    tracing::info!(%cart_id, "Persisted cart no longer exists");
                    self.inner.persistence.clear_cart_id()?;
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        }
        .await;

        match result {
            Ok(cart) => {
                self.publish_ready(cart.clone());
                Ok(cart)
            }
            Err(e) => Err(self.publish_error(e)),
        }
    }

    /// Add `quantity` of a variant, creating the cart first if none is persisted.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuantity` for quantities outside `1..=10`, otherwise any
    /// backend or storage failure.
    #[instrument(skip(self, variant_id), fields(variant_id = %variant_id))]
    pub async fn add_item(&self, variant_id: &VariantId, quantity: u32) -> Result<Cart, CartError> {
        let quantity = Quantity::new(quantity)?;
        add_breadcrumb("cart", "Add item", Some(&[("variant_id", variant_id.as_str())]));

        self.mutate(async {
            let cart_id = self.resolve_or_create_cart_id().await?;
            self.inner
                .backend
                .add_line_item(&cart_id, variant_id, quantity.get())
                .await
                .map_err(CartError::from)
        })
        .await
    }

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns `NoCart` when no cart id is persisted, `InvalidQuantity` for
    /// quantities outside `1..=10`, otherwise any backend or storage failure.
    #[instrument(skip(self, item_id), fields(item_id = %item_id))]
    pub async fn update_item(&self, item_id: &LineItemId, quantity: u32) -> Result<Cart, CartError> {
        let quantity = Quantity::new(quantity)?;
        add_breadcrumb("cart", "Update item", Some(&[("item_id", item_id.as_str())]));

        self.mutate(async {
            let cart_id = self.require_cart_id()?;
            self.inner
                .backend
                .update_line_item(&cart_id, item_id, quantity.get())
                .await
                .map_err(CartError::from)
        })
        .await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `NoCart` when no cart id is persisted, otherwise any backend or
    /// storage failure.
    #[instrument(skip(self, item_id), fields(item_id = %item_id))]
    pub async fn remove_item(&self, item_id: &LineItemId) -> Result<Cart, CartError> {
        add_breadcrumb("cart", "Remove item", Some(&[("item_id", item_id.as_str())]));

        self.mutate(async {
            let cart_id = self.require_cart_id()?;
            self.inner
                .backend
                .remove_line_item(&cart_id, item_id)
                .await
                .map_err(CartError::from)
        })
        .await
    }

    /// Drop the current cart and start a new, empty one.
    ///
    /// The old cart is abandoned, not emptied, on the backend.
    ///
    /// # Errors
    ///
    /// Returns any backend or storage failure. The old id is forgotten even
    /// if creating the new cart fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<Cart, CartError> {
        add_breadcrumb("cart", "Clear cart", None);

        self.mutate(async {
            self.inner.persistence.clear_cart_id()?;
            self.inner.snapshot.send_modify(|s| s.cart = None);
            self.create_cart().await
        })
        .await
    }

    /// Re-fetch the persisted cart, replacing it with a new one if the fetch
    /// fails for any reason.
    ///
    /// # Errors
    ///
    /// Returns an error only if creating the replacement cart fails.
    #[instrument(skip(self))]
    pub async fn refresh_cart(&self) -> Result<Cart, CartError> {
        self.mutate(async {
            if let Some(cart_id) = self.inner.persistence.cart_id()? {
                match self.inner.backend.get_cart(&cart_id).await {
                    Ok(cart) => return Ok(cart),
                    Err(e) if e.is_not_found() => {
                        tracing::info!(%cart_id, "Cart expired, creating a new one");
                    }
                    Err(e) => {
                        tracing::warn!(%cart_id, error = %e, "Cart refresh failed, creating a new one");
                    }
                }
            }
            self.create_cart().await
        })
        .await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Run one mutation with the queue held, publishing its outcome.
    async fn mutate(
        &self,
        operation: impl Future<Output = Result<Cart, CartError>>,
    ) -> Result<Cart, CartError> {
        let _turn = self.inner.queue.lock().await;
        self.set_loading();

        match operation.await {
            Ok(cart) => {
                self.publish_ready(Some(cart.clone()));
                Ok(cart)
            }
            Err(e) => Err(self.publish_error(e)),
        }
    }

    fn require_cart_id(&self) -> Result<CartId, CartError> {
        self.inner.persistence.cart_id()?.ok_or(CartError::NoCart)
    }

    async fn resolve_or_create_cart_id(&self) -> Result<CartId, CartError> {
        if let Some(cart_id) = self.inner.persistence.cart_id()? {
            return Ok(cart_id);
        }
        Ok(self.create_cart().await?.id)
    }

    /// Create a cart, persist its id and make it the current cart, so the
    /// snapshot tracks the persisted id even if a later step fails.
    async fn create_cart(&self) -> Result<Cart, CartError> {
        let cart = self
            .inner
            .backend
            .create_cart(self.inner.region_id.as_ref())
            .await?;
        self.inner.persistence.set_cart_id(&cart.id)?;
        self.inner
            .snapshot
            .send_modify(|s| s.cart = Some(cart.clone()));
        tracing::info!(cart_id = %cart.id, "Created cart");
        Ok(cart)
    }

    fn set_loading(&self) {
        self.inner.snapshot.send_modify(|s| s.status = CartStatus::Loading);
    }

    fn publish_ready(&self, cart: Option<Cart>) {
        self.inner.snapshot.send_modify(|s| {
            s.status = CartStatus::Ready;
            s.cart = cart;
            s.error = None;
        });
    }

    fn publish_error(&self, error: CartError) -> CartError {
        tracing::warn!(error = %error, "Cart operation failed");
        let message = error.to_string();
        self.inner.snapshot.send_modify(|s| {
            s.status = CartStatus::Error;
            s.error = Some(message);
        });
        error
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::api::ApiError;
    use crate::test_support::MockBackend;

    fn store_with(backend: &Arc<MockBackend>, persistence: &Persistence) -> CartStore {
        CartStore::new(backend.clone(), persistence.clone(), None)
    }

    #[tokio::test]
    async fn test_first_add_creates_cart_once_then_adds() {
        let backend = Arc::new(MockBackend::new());
        let persistence = Persistence::in_memory();
        let store = store_with(&backend, &persistence);

        let cart = store.add_item(&VariantId::new("variant_1"), 1).await.unwrap();

        assert_eq!(backend.calls(), vec!["create_cart", "add_line_item"]);
        assert_eq!(persistence.cart_id().unwrap().unwrap(), cart.id);
        assert_eq!(store.cart().unwrap().id, cart.id);
        assert_eq!(store.snapshot().status, CartStatus::Ready);
        assert_eq!(store.item_count(), 1);
    }

    #[tokio::test]
    async fn test_second_add_reuses_persisted_cart() {
        let backend = Arc::new(MockBackend::new());
        let persistence = Persistence::in_memory();
        let store = store_with(&backend, &persistence);

        store.add_item(&VariantId::new("variant_1"), 1).await.unwrap();
        store.add_item(&VariantId::new("variant_2"), 3).await.unwrap();

        assert_eq!(backend.count("create_cart"), 1);
        assert_eq!(backend.count("add_line_item"), 2);
        assert_eq!(store.item_count(), 4);
    }

    #[tokio::test]
    async fn test_update_and_remove_require_cart() {
        let backend = Arc::new(MockBackend::new());
        let store = store_with(&backend, &Persistence::in_memory());

        let err = store
            .update_item(&LineItemId::new("item_1"), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::NoCart));
        assert_eq!(err.to_string(), "No cart found");

        let err = store.remove_item(&LineItemId::new("item_1")).await.unwrap_err();
        assert!(matches!(err, CartError::NoCart));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.status, CartStatus::Error);
        assert_eq!(snapshot.error.as_deref(), Some("No cart found"));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_quantity_bounds_checked_before_any_call() {
        let backend = Arc::new(MockBackend::new());
        let store = store_with(&backend, &Persistence::in_memory());

        for quantity in [0, 11] {
            let err = store
                .add_item(&VariantId::new("variant_1"), quantity)
                .await
                .unwrap_err();
            assert!(matches!(err, CartError::InvalidQuantity(_)));
        }
        assert!(backend.calls().is_empty());
        assert_eq!(store.snapshot().status, CartStatus::Uninitialized);
    }

    #[tokio::test]
    async fn test_update_then_remove_replaces_cart() {
        let backend = Arc::new(MockBackend::new());
        let store = store_with(&backend, &Persistence::in_memory());

        let cart = store.add_item(&VariantId::new("variant_1"), 1).await.unwrap();
        let item_id = cart.items[0].id.clone();

        let cart = store.update_item(&item_id, 5).await.unwrap();
        assert_eq!(cart.items[0].quantity, 5);
        assert_eq!(store.cart().unwrap().subtotal, 5 * 2500);

        let cart = store.remove_item(&item_id).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(store.item_count(), 0);
    }

    #[tokio::test]
    async fn test_clear_cart_starts_new_cart_without_emptying_old() {
        let backend = Arc::new(MockBackend::new());
        let persistence = Persistence::in_memory();
        let store = store_with(&backend, &persistence);

        let old = store.add_item(&VariantId::new("variant_1"), 2).await.unwrap();
        let new = store.clear_cart().await.unwrap();

        assert_ne!(old.id, new.id);
        assert!(new.is_empty());
        assert_eq!(persistence.cart_id().unwrap().unwrap(), new.id);
        assert_eq!(backend.server_cart(&old.id).unwrap().item_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_first_add_keeps_created_cart_current() {
        let backend = Arc::new(MockBackend::new());
        let persistence = Persistence::in_memory();
        let store = store_with(&backend, &persistence);
        backend.fail_next(
            "add_line_item",
            ApiError::Status {
                status: 500,
                message: "Internal Server Error".into(),
            },
        );

        store.add_item(&VariantId::new("variant_1"), 1).await.unwrap_err();

        let persisted = persistence.cart_id().unwrap().unwrap();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.status, CartStatus::Error);
        assert_eq!(snapshot.cart.unwrap().id, persisted);

        let cart = store.add_item(&VariantId::new("variant_1"), 1).await.unwrap();
        assert_eq!(cart.id, persisted);
        assert_eq!(backend.count("create_cart"), 1);
    }

    #[tokio::test]
    async fn test_clear_cart_failure_drops_old_cart() {
        let backend = Arc::new(MockBackend::new());
        let persistence = Persistence::in_memory();
        let store = store_with(&backend, &persistence);
        store.add_item(&VariantId::new("variant_1"), 1).await.unwrap();
        backend.fail_next("create_cart", ApiError::Connection("refused".into()));

        store.clear_cart().await.unwrap_err();

        assert!(persistence.cart_id().unwrap().is_none());
        assert!(store.cart().is_none());
    }

    #[tokio::test]
    async fn test_refresh_falls_back_to_new_cart() {
        let backend = Arc::new(MockBackend::new());
        let persistence = Persistence::in_memory();
        let store = store_with(&backend, &persistence);

        let old = store.add_item(&VariantId::new("variant_1"), 1).await.unwrap();
        assert_eq!(store.refresh_cart().await.unwrap().id, old.id);

        backend.expire_cart(&old.id);
        let fresh = store.refresh_cart().await.unwrap();
        assert_ne!(fresh.id, old.id);
        assert_eq!(persistence.cart_id().unwrap().unwrap(), fresh.id);
    }

    #[tokio::test]
    async fn test_initialize_forgets_expired_cart() {
        let backend = Arc::new(MockBackend::new());
        let persistence = Persistence::in_memory();
        persistence.set_cart_id(&CartId::new("cart_gone")).unwrap();
        let store = store_with(&backend, &persistence);

        assert!(store.initialize().await.unwrap().is_none());
        assert!(persistence.cart_id().unwrap().is_none());
        assert_eq!(store.snapshot().status, CartStatus::Ready);
    }

    #[tokio::test]
    async fn test_error_state_keeps_cart_and_allows_retry() {
        let backend = Arc::new(MockBackend::new());
        let store = store_with(&backend, &Persistence::in_memory());
        let cart = store.add_item(&VariantId::new("variant_1"), 1).await.unwrap();

        backend.set_offline(true);
        let err = store
            .add_item(&VariantId::new("variant_2"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::Api(ApiError::Connection(_))));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.status, CartStatus::Error);
        assert_eq!(snapshot.cart.unwrap().id, cart.id);

        backend.set_offline(false);
        store.add_item(&VariantId::new("variant_2"), 1).await.unwrap();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.status, CartStatus::Ready);
        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.item_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_updates_apply_in_call_order() {
        let backend = Arc::new(MockBackend::new());
        let store = store_with(&backend, &Persistence::in_memory());
        let cart = store.add_item(&VariantId::new("variant_1"), 1).await.unwrap();
        let item_id = cart.items[0].id.clone();

        // The first request is slower; without serialisation its response
        // would land last and win.
        backend.push_latencies([Duration::from_millis(50), Duration::from_millis(1)]);

        let first = {
            let store = store.clone();
            let item_id = item_id.clone();
            tokio::spawn(async move { store.update_item(&item_id, 3).await })
        };
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = {
            let store = store.clone();
            let item_id = item_id.clone();
            tokio::spawn(async move { store.update_item(&item_id, 7).await })
        };

        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        assert_eq!(store.cart().unwrap().items[0].quantity, 7);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let backend = Arc::new(MockBackend::new());
        let store = store_with(&backend, &Persistence::in_memory());
        let mut header = store.subscribe();
        let drawer = store.clone();

        store.add_item(&VariantId::new("variant_1"), 2).await.unwrap();

        assert!(header.has_changed().unwrap());
        assert_eq!(header.borrow_and_update().item_count(), 2);
        assert_eq!(drawer.item_count(), 2);
    }
}
