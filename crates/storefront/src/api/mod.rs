//! Commerce backend API client.
//!
//! # Architecture
//!
//! - [`CommerceBackend`] is the seam every store depends on; tests substitute
//!   their own implementation or point [`CommerceClient`] at a mock server
//! - The backend is the source of truth - no local sync, direct REST calls
//! - Catalog reads are cached in memory via `moka` (configurable TTL)
//! - No retries: failures surface to the caller immediately
//!
//! # Example
//!
//! ```rust,ignore
//! use mystery_box_storefront::api::{CommerceBackend, CommerceClient};
//!
//! let client = CommerceClient::new(&config)?;
//!
//! let product = client.get_product_by_handle("mystery-box").await?;
//! let cart = client.create_cart(None).await?;
//! let cart = client.add_line_item(&cart.id, &product.variants[0].id, 1).await?;
//! ```

mod cache;
mod client;
pub mod types;

use async_trait::async_trait;
use mystery_box_core::{
    AddressId, AddressInput, Cart, CartId, Category, CategoryId, Collection, CollectionId,
    Customer, LineItemId, Product, ProductId, RegionId, VariantId,
};
use secrecy::SecretString;
use thiserror::Error;

pub use client::CommerceClient;
pub use types::{CategoryList, CollectionList, NewCustomer, ProductList, ProductQuery};

/// Page size used when walking the whole catalog.
const FETCH_ALL_PAGE_SIZE: u32 = 100;

/// Prefixes the backend puts on catalog ids. Anything else is a handle.
pub const PRODUCT_ID_PREFIX: &str = "prod_";
pub const CATEGORY_ID_PREFIX: &str = "pcat_";
pub const COLLECTION_ID_PREFIX: &str = "pcol_";

/// Message shown when the backend cannot be reached at all.
pub const CONNECTION_MESSAGE: &str =
    "Cannot connect to server. Please check your connection and try again.";

/// Errors that can occur when talking to the commerce backend.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, refused, timeout).
    #[error("{CONNECTION_MESSAGE}")]
    Connection(String),

    /// The resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or rejected credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Any other non-success response.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Backend message, or the canonical reason phrase if none was sent.
        message: String,
    },

    /// A non-success status with nothing in the body, as sent by proxies and
    /// gateways in front of the backend.
    #[error("HTTP {0} with an empty response body")]
    EmptyResponse(u16),

    /// The response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    Decode(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client setup failed: {0}")]
    Setup(String),
}

impl ApiError {
    /// HTTP status carried by the error, when there was a response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound(_) => Some(404),
            Self::Unauthorized(_) => Some(401),
            Self::Status { status, .. } | Self::EmptyResponse(status) => Some(*status),
            Self::Connection(_) | Self::Decode(_) | Self::Setup(_) => None,
        }
    }

    /// The backend's own message, when it sent one.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::NotFound(m) | Self::Unauthorized(m) | Self::Status { message: m, .. } => {
                Some(m.as_str())
            }
            Self::Connection(_) | Self::EmptyResponse(_) | Self::Decode(_) | Self::Setup(_) => {
                None
            }
        }
    }

    /// Whether no response was received.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Whether the backend reported the resource missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Operations the storefront needs from the commerce backend.
///
/// Every method either returns the unwrapped payload or an [`ApiError`].
#[async_trait]
pub trait CommerceBackend: Send + Sync {
    // Catalog

    async fn list_products(&self, query: &ProductQuery) -> Result<ProductList, ApiError>;
    async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError>;
    async fn get_product_by_handle(&self, handle: &str) -> Result<Product, ApiError>;
    async fn list_categories(&self) -> Result<CategoryList, ApiError>;
    async fn get_category(&self, id: &CategoryId) -> Result<Category, ApiError>;
    async fn list_collections(&self) -> Result<CollectionList, ApiError>;
    async fn get_collection(&self, id: &CollectionId) -> Result<Collection, ApiError>;

    // Cart

    async fn create_cart(&self, region_id: Option<&RegionId>) -> Result<Cart, ApiError>;
    async fn get_cart(&self, id: &CartId) -> Result<Cart, ApiError>;
    async fn add_line_item(
        &self,
        cart_id: &CartId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<Cart, ApiError>;
    async fn update_line_item(
        &self,
        cart_id: &CartId,
        item_id: &LineItemId,
        quantity: u32,
    ) -> Result<Cart, ApiError>;
    async fn remove_line_item(&self, cart_id: &CartId, item_id: &LineItemId)
    -> Result<Cart, ApiError>;

    // Customer & auth

    async fn create_session(&self, email: &str, password: &str) -> Result<SecretString, ApiError>;
    async fn delete_session(&self, token: &SecretString) -> Result<(), ApiError>;
    async fn get_customer(&self, token: &SecretString) -> Result<Customer, ApiError>;
    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer, ApiError>;
    async fn add_address(
        &self,
        token: &SecretString,
        address: &AddressInput,
    ) -> Result<Customer, ApiError>;
    async fn update_address(
        &self,
        token: &SecretString,
        id: &AddressId,
        address: &AddressInput,
    ) -> Result<Customer, ApiError>;
    async fn delete_address(&self, token: &SecretString, id: &AddressId)
    -> Result<Customer, ApiError>;
    async fn set_default_address(
        &self,
        token: &SecretString,
        id: &AddressId,
    ) -> Result<Customer, ApiError>;

    /// Look a product up by id or handle.
    async fn find_product(&self, key: &str) -> Result<Product, ApiError> {
        if key.starts_with(PRODUCT_ID_PREFIX) {
            return self.get_product(&ProductId::new(key)).await;
        }
        self.get_product_by_handle(key).await
    }

    /// Look a category up by id (retrieve endpoint) or handle (list scan).
    async fn find_category(&self, key: &str) -> Result<Category, ApiError> {
        if key.starts_with(CATEGORY_ID_PREFIX) {
            return self.get_category(&CategoryId::new(key)).await;
        }
        self.list_categories()
            .await?
            .categories
            .into_iter()
            .find(|c| c.handle == key)
            .ok_or_else(|| ApiError::NotFound(format!("Category not found: {key}")))
    }

    /// Look a collection up by id (retrieve endpoint) or handle (list scan).
    async fn find_collection(&self, key: &str) -> Result<Collection, ApiError> {
        if key.starts_with(COLLECTION_ID_PREFIX) {
            return self.get_collection(&CollectionId::new(key)).await;
        }
        self.list_collections()
            .await?
            .collections
            .into_iter()
            .find(|c| c.handle == key)
            .ok_or_else(|| ApiError::NotFound(format!("Collection not found: {key}")))
    }

    /// Fetch every product matching `query`, walking the paginated endpoint.
    ///
    /// `limit` and `offset` on the input are ignored.
    async fn list_all_products(&self, query: &ProductQuery) -> Result<Vec<Product>, ApiError> {
        let mut page_query = query.clone();
        page_query.limit = Some(FETCH_ALL_PAGE_SIZE);
        page_query.offset = Some(0);

        let mut products = Vec::new();
        loop {
            let page = self.list_products(&page_query).await?;
            let fetched = u32::try_from(page.products.len()).unwrap_or(u32::MAX);
            products.extend(page.products);

            let seen = u32::try_from(products.len()).unwrap_or(u32::MAX);
            if fetched == 0 || seen >= page.count {
                break;
            }
            page_query.offset = Some(seen);
        }

        tracing::debug!(count = products.len(), "Fetched full product list");
        Ok(products)
    }
}
