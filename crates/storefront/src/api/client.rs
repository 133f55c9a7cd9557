//! `reqwest` implementation of [`CommerceBackend`].

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use mystery_box_core::{
    Address, AddressId, AddressInput, Cart, CartId, Category, CategoryId, Collection, CollectionId,
    Customer, DEFAULT_ADDRESS_KEY, LineItemId, Product, ProductId, RegionId, VariantId,
};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::cache::{CacheKey, CacheValue};
use super::types::{
    AddLineItemBody, AddressBody, AddressMetadataBody, CartEnvelope, CategoryEnvelope,
    CategoryList, CollectionEnvelope, CollectionList, CreateCartBody, CredentialsBody,
    CustomerEnvelope, ErrorBody, NewCustomer, ProductEnvelope, ProductList, ProductQuery,
    TokenEnvelope, UpdateLineItemBody,
};
use super::{ApiError, CommerceBackend};
use crate::config::StorefrontConfig;

const PUBLISHABLE_KEY_HEADER: &str = "x-publishable-api-key";
const CACHE_CAPACITY: u64 = 1000;

// =============================================================================
// CommerceClient
// =============================================================================

/// Client for the commerce backend's store API.
///
/// Cheaply cloneable. Catalog reads are cached for the configured TTL; a TTL
/// of zero disables the cache.
#[derive(Clone)]
pub struct CommerceClient {
    inner: Arc<CommerceClientInner>,
}

struct CommerceClientInner {
    http: reqwest::Client,
    base_url: Url,
    publishable_key: Option<SecretString>,
    cache: Option<Cache<CacheKey, CacheValue>>,
}

impl std::fmt::Debug for CommerceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("cached", &self.inner.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl CommerceClient {
    /// Create a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Setup` if the HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Setup(e.to_string()))?;

        let cache = (!config.cache_ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(config.cache_ttl)
                .build()
        });

        Ok(Self {
            inner: Arc::new(CommerceClientInner {
                http,
                base_url: config.backend_url.clone(),
                publishable_key: config.publishable_key.clone(),
                cache,
            }),
        })
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    /// Build an endpoint URL from path segments, escaping each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Setup(format!("{} cannot be a base URL", self.inner.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.inner.http.request(method, url);
        match &self.inner.publishable_key {
            Some(key) => builder.header(PUBLISHABLE_KEY_HEADER, key.expose_secret()),
            None => builder,
        }
    }

    fn authed(&self, method: Method, url: Url, token: &SecretString) -> RequestBuilder {
        self.request(method, url).bearer_auth(token.expose_secret())
    }

    /// Send a request and decode a JSON body.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send_raw(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to decode backend response"
            );
            ApiError::Decode(e.to_string())
        })
    }

    /// Send a request, mapping transport failures and non-2xx statuses.
    async fn send_raw(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, "Backend request failed");
            ApiError::Connection(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Connection(e.to_string()))?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(error_from_response(status, &body))
        }
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(request.json(body)).await
    }

    async fn cache_get(&self, key: &CacheKey) -> Option<CacheValue> {
        match &self.inner.cache {
            Some(cache) => cache.get(key).await,
            None => None,
        }
    }

    async fn cache_put(&self, key: CacheKey, value: CacheValue) {
        if let Some(cache) = &self.inner.cache {
            cache.insert(key, value).await;
        }
    }

    async fn update_address_metadata(
        &self,
        token: &SecretString,
        address: &Address,
        is_default: bool,
    ) -> Result<Customer, ApiError> {
        let mut metadata = address.metadata.clone().unwrap_or_default();
        metadata.insert(DEFAULT_ADDRESS_KEY.to_owned(), is_default.into());

        let url = self.endpoint(&["store", "customers", "me", "addresses", address.id.as_str()])?;
        let envelope: CustomerEnvelope = self
            .post_json(
                self.authed(Method::POST, url, token),
                &AddressMetadataBody { metadata },
            )
            .await?;
        Ok(envelope.customer)
    }
}

/// Turn a non-2xx response into an [`ApiError`], keeping the backend's message.
fn error_from_response(status: StatusCode, body: &str) -> ApiError {
    if body.trim().is_empty() {
        tracing::warn!(%status, "Backend returned an error with no body");
        return ApiError::EmptyResponse(status.as_u16());
    }

    let parsed = serde_json::from_str::<ErrorBody>(body).unwrap_or_default();
    if let Some(kind) = &parsed.kind {
        debug!(%status, kind, "Backend error type");
    }

    let message = parsed
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_owned());

    match status {
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
        _ => ApiError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl CommerceBackend for CommerceClient {
    // =========================================================================
    // Catalog
    // =========================================================================

    #[instrument(skip(self))]
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductList, ApiError> {
        let key = CacheKey::Products(query.cache_key());
        if let Some(CacheValue::Products(list)) = self.cache_get(&key).await {
            debug!("Cache hit for products");
            return Ok(list);
        }

        let mut url = self.endpoint(&["store", "products"])?;
        query.apply_to(&mut url);
        let list: ProductList = self.send(self.request(Method::GET, url)).await?;

        self.cache_put(key, CacheValue::Products(list.clone())).await;
        Ok(list)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let key = CacheKey::Product(id.to_string());
        if let Some(CacheValue::Product(product)) = self.cache_get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let url = self.endpoint(&["store", "products", id.as_str()])?;
        let envelope: ProductEnvelope = self.send(self.request(Method::GET, url)).await?;

        self.cache_put(key, CacheValue::Product(Box::new(envelope.product.clone())))
            .await;
        Ok(envelope.product)
    }

    #[instrument(skip(self))]
    async fn get_product_by_handle(&self, handle: &str) -> Result<Product, ApiError> {
        let key = CacheKey::ProductByHandle(handle.to_owned());
        if let Some(CacheValue::Product(product)) = self.cache_get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let list = self.list_products(&ProductQuery::by_handle(handle)).await?;
        let product = list
            .products
            .into_iter()
            .find(|p| p.handle == handle)
            .ok_or_else(|| ApiError::NotFound(format!("Product not found: {handle}")))?;

        self.cache_put(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn list_categories(&self) -> Result<CategoryList, ApiError> {
        if let Some(CacheValue::Categories(list)) = self.cache_get(&CacheKey::Categories).await {
            debug!("Cache hit for categories");
            return Ok(list);
        }

        let url = self.endpoint(&["store", "product-categories"])?;
        let list: CategoryList = self.send(self.request(Method::GET, url)).await?;

        self.cache_put(CacheKey::Categories, CacheValue::Categories(list.clone()))
            .await;
        Ok(list)
    }

    #[instrument(skip(self), fields(category_id = %id))]
    async fn get_category(&self, id: &CategoryId) -> Result<Category, ApiError> {
        let key = CacheKey::Category(id.to_string());
        if let Some(CacheValue::Category(category)) = self.cache_get(&key).await {
            return Ok(category);
        }

        let url = self.endpoint(&["store", "product-categories", id.as_str()])?;
        let envelope: CategoryEnvelope = self.send(self.request(Method::GET, url)).await?;

        self.cache_put(key, CacheValue::Category(envelope.product_category.clone()))
            .await;
        Ok(envelope.product_category)
    }

    #[instrument(skip(self))]
    async fn list_collections(&self) -> Result<CollectionList, ApiError> {
        if let Some(CacheValue::Collections(list)) = self.cache_get(&CacheKey::Collections).await
        {
            debug!("Cache hit for collections");
            return Ok(list);
        }

        let url = self.endpoint(&["store", "collections"])?;
        let list: CollectionList = self.send(self.request(Method::GET, url)).await?;

        self.cache_put(CacheKey::Collections, CacheValue::Collections(list.clone()))
            .await;
        Ok(list)
    }

    #[instrument(skip(self), fields(collection_id = %id))]
    async fn get_collection(&self, id: &CollectionId) -> Result<Collection, ApiError> {
        let key = CacheKey::Collection(id.to_string());
        if let Some(CacheValue::Collection(collection)) = self.cache_get(&key).await {
            return Ok(collection);
        }

        let url = self.endpoint(&["store", "collections", id.as_str()])?;
        let envelope: CollectionEnvelope = self.send(self.request(Method::GET, url)).await?;

        self.cache_put(key, CacheValue::Collection(envelope.collection.clone()))
            .await;
        Ok(envelope.collection)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    #[instrument(skip(self))]
    async fn create_cart(&self, region_id: Option<&RegionId>) -> Result<Cart, ApiError> {
        let url = self.endpoint(&["store", "carts"])?;
        let envelope: CartEnvelope = self
            .post_json(
                self.request(Method::POST, url),
                &CreateCartBody { region_id },
            )
            .await?;
        debug!(cart_id = %envelope.cart.id, "Created cart");
        Ok(envelope.cart)
    }

    #[instrument(skip(self), fields(cart_id = %id))]
    async fn get_cart(&self, id: &CartId) -> Result<Cart, ApiError> {
        let url = self.endpoint(&["store", "carts", id.as_str()])?;
        let envelope: CartEnvelope = self.send(self.request(Method::GET, url)).await?;
        Ok(envelope.cart)
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, variant_id = %variant_id))]
    async fn add_line_item(
        &self,
        cart_id: &CartId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<Cart, ApiError> {
        let url = self.endpoint(&["store", "carts", cart_id.as_str(), "line-items"])?;
        let envelope: CartEnvelope = self
            .post_json(
                self.request(Method::POST, url),
                &AddLineItemBody {
                    variant_id,
                    quantity,
                },
            )
            .await?;
        Ok(envelope.cart)
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, item_id = %item_id))]
    async fn update_line_item(
        &self,
        cart_id: &CartId,
        item_id: &LineItemId,
        quantity: u32,
    ) -> Result<Cart, ApiError> {
        let url = self.endpoint(&[
            "store",
            "carts",
            cart_id.as_str(),
            "line-items",
            item_id.as_str(),
        ])?;
        let envelope: CartEnvelope = self
            .post_json(
                self.request(Method::POST, url),
                &UpdateLineItemBody { quantity },
            )
            .await?;
        Ok(envelope.cart)
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, item_id = %item_id))]
    async fn remove_line_item(
        &self,
        cart_id: &CartId,
        item_id: &LineItemId,
    ) -> Result<Cart, ApiError> {
        let url = self.endpoint(&[
            "store",
            "carts",
            cart_id.as_str(),
            "line-items",
            item_id.as_str(),
        ])?;
        let envelope: CartEnvelope = self.send(self.request(Method::DELETE, url)).await?;
        Ok(envelope.cart)
    }

    // =========================================================================
    // Customer & auth
    // =========================================================================

    #[instrument(skip(self, password))]
    async fn create_session(&self, email: &str, password: &str) -> Result<SecretString, ApiError> {
        let url = self.endpoint(&["store", "auth", "token"])?;
        let envelope: TokenEnvelope = self
            .post_json(
                self.request(Method::POST, url),
                &CredentialsBody { email, password },
            )
            .await?;
        Ok(SecretString::from(envelope.access_token))
    }

    #[instrument(skip_all)]
    async fn delete_session(&self, token: &SecretString) -> Result<(), ApiError> {
        let url = self.endpoint(&["store", "auth"])?;
        self.send_raw(self.authed(Method::DELETE, url, token))
            .await
            .map(drop)
    }

    #[instrument(skip_all)]
    async fn get_customer(&self, token: &SecretString) -> Result<Customer, ApiError> {
        let url = self.endpoint(&["store", "customers", "me"])?;
        let envelope: CustomerEnvelope = self.send(self.authed(Method::GET, url, token)).await?;
        Ok(envelope.customer)
    }

    #[instrument(skip_all, fields(email = %customer.email))]
    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer, ApiError> {
        let url = self.endpoint(&["store", "customers"])?;
        let envelope: CustomerEnvelope = self
            .post_json(self.request(Method::POST, url), customer)
            .await?;
        Ok(envelope.customer)
    }

    #[instrument(skip_all)]
    async fn add_address(
        &self,
        token: &SecretString,
        address: &AddressInput,
    ) -> Result<Customer, ApiError> {
        let url = self.endpoint(&["store", "customers", "me", "addresses"])?;
        let envelope: CustomerEnvelope = self
            .post_json(self.authed(Method::POST, url, token), &AddressBody { address })
            .await?;
        Ok(envelope.customer)
    }

    #[instrument(skip(self, token, address), fields(address_id = %id))]
    async fn update_address(
        &self,
        token: &SecretString,
        id: &AddressId,
        address: &AddressInput,
    ) -> Result<Customer, ApiError> {
        let url = self.endpoint(&["store", "customers", "me", "addresses", id.as_str()])?;
        let envelope: CustomerEnvelope = self
            .post_json(self.authed(Method::POST, url, token), address)
            .await?;
        Ok(envelope.customer)
    }

    #[instrument(skip(self, token), fields(address_id = %id))]
    async fn delete_address(
        &self,
        token: &SecretString,
        id: &AddressId,
    ) -> Result<Customer, ApiError> {
        let url = self.endpoint(&["store", "customers", "me", "addresses", id.as_str()])?;
        let envelope: CustomerEnvelope = self.send(self.authed(Method::DELETE, url, token)).await?;
        Ok(envelope.customer)
    }

    /// The backend has no default-address field; the flag lives in the
    /// address metadata. Any previous default is cleared first.
    #[instrument(skip(self, token), fields(address_id = %id))]
    async fn set_default_address(
        &self,
        token: &SecretString,
        id: &AddressId,
    ) -> Result<Customer, ApiError> {
        let customer = self.get_customer(token).await?;
        let target = customer
            .shipping_addresses
            .iter()
            .find(|a| &a.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("Address not found: {id}")))?;

        for previous in customer
            .shipping_addresses
            .iter()
            .filter(|a| a.is_default() && &a.id != id)
        {
            debug!(previous = %previous.id, "Clearing previous default address");
            self.update_address_metadata(token, previous, false).await?;
        }

        self.update_address_metadata(token, target, true).await
    }
}
