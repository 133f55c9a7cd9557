//! Integration tests for Mystery Box.
//!
//! [`TestShop`] runs an in-process commerce backend on a random port. It
//! keeps carts and accounts in memory and speaks the same store API the
//! real backend does, so tests exercise the full stack: HTTP client, cart
//! container, file persistence and catalog pipeline.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p mystery-box-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mystery_box_core::{
    Address, AddressId, Cart, CartId, CartItem, CartVariant, CurrencyCode, Customer, LineItemId,
    Product, Region, RegionId, VariantId,
};
use mystery_box_storefront::persistence::{FileStore, Persistence};
use mystery_box_storefront::{Storefront, StorefrontConfig};
use serde_json::{Value, json};
use wiremock::matchers::path_regex;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Region every fake cart belongs to.
pub const REGION_ID: &str = "reg_test";

const TOKEN_PREFIX: &str = "token_";

/// An in-process commerce backend.
pub struct TestShop {
    server: MockServer,
    state: Arc<Mutex<ShopState>>,
}

#[derive(Default)]
struct ShopState {
    products: Vec<Product>,
    carts: HashMap<CartId, Cart>,
    accounts: HashMap<String, Account>,
    /// Statuses to return, in order, before serving normally again.
    failures: VecDeque<(u16, String)>,
    next_id: u64,
}

struct Account {
    password: String,
    customer: Customer,
}

impl ShopState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_{:04}", self.next_id)
    }
}

impl TestShop {
    /// Start a shop selling `products`.
    pub async fn start(products: Vec<Product>) -> Self {
        let server = MockServer::start().await;
        let state = Arc::new(Mutex::new(ShopState {
            products,
            ..ShopState::default()
        }));

        Mock::given(path_regex("^/store/"))
            .respond_with(Router {
                state: Arc::clone(&state),
            })
            .mount(&server)
            .await;

        Self { server, state }
    }

    /// Configuration pointing at this shop, persisting under `data_dir`.
    /// Catalog caching is off so every read hits the shop.
    ///
    /// # Panics
    ///
    /// Panics if the mock server URI is not a valid URL.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn config(&self, data_dir: &Path) -> StorefrontConfig {
        let mut config = StorefrontConfig::for_backend(self.server.uri().parse().unwrap());
        config.data_dir = data_dir.to_path_buf();
        config.region_id = Some(REGION_ID.to_owned());
        config.cache_ttl = std::time::Duration::ZERO;
        config
    }

    /// A storefront talking to this shop over HTTP.
    ///
    /// # Panics
    ///
    /// Panics if persisted state under `data_dir` is unreadable.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn storefront(&self, data_dir: &Path) -> Storefront {
        Storefront::new(self.config(data_dir)).unwrap()
    }

    /// Persistence over the same directory a storefront would use.
    #[must_use]
    pub fn persistence(data_dir: &Path) -> Persistence {
        Persistence::new(Arc::new(FileStore::new(data_dir)))
    }

    /// Register an account directly, bypassing the API.
    pub fn register_account(&self, email: &str, password: &str) {
        let mut state = self.lock();
        let id = state.next_id("cus");
        let customer = customer_json(&id, email, &[]);
        state.accounts.insert(
            email.to_owned(),
            Account {
                password: password.to_owned(),
                customer,
            },
        );
    }

    /// Make the backend forget a cart, as if it had expired.
    pub fn expire_cart(&self, id: &CartId) {
        self.lock().carts.remove(id);
    }

    /// The backend's copy of a cart.
    #[must_use]
    pub fn cart(&self, id: &CartId) -> Option<Cart> {
        self.lock().carts.get(id).cloned()
    }

    #[must_use]
    pub fn cart_count(&self) -> usize {
        self.lock().carts.len()
    }

    /// Answer the next request with `status` and `message`.
    pub fn fail_next(&self, status: u16, message: &str) {
        self.lock().failures.push_back((status, message.to_owned()));
    }

    /// Every request received so far.
    ///
    /// # Panics
    ///
    /// Panics if request recording is disabled on the mock server.
    #[allow(clippy::unwrap_used)]
    pub async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap()
    }

    fn lock(&self) -> MutexGuard<'_, ShopState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// Catalog fixtures
// =============================================================================

/// A single-variant product priced in USD cents.
///
/// # Panics
///
/// Panics if the fixture does not deserialize.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn product(
    id: &str,
    title: &str,
    category: &str,
    tags: &[&str],
    price: i64,
    created_at: &str,
) -> Product {
    let tags: Vec<Value> = tags.iter().map(|t| json!({ "value": t })).collect();
    serde_json::from_value(json!({
        "id": id,
        "title": title,
        "handle": id.replace('_', "-"),
        "description": format!("{title} from the {category} range"),
        "categories": [{ "id": format!("pcat_{category}"), "name": category, "handle": category }],
        "tags": tags,
        "variants": [{
            "id": format!("variant_{id}"),
            "title": "Default",
            "inventory_quantity": 10,
            "prices": [{ "amount": price, "currency_code": "usd" }]
        }],
        "created_at": created_at,
    }))
    .unwrap()
}

/// `count` products alternating between the `phones` and `accessories`
/// categories, priced at `n * 10` dollars and created one day apart.
#[must_use]
pub fn catalog(count: u32) -> Vec<Product> {
    (1..=count)
        .map(|n| {
            let (category, brand) = if n % 2 == 0 {
                ("phones", "Apple")
            } else {
                ("accessories", "Samsung")
            };
            let day = (n - 1) % 28 + 1;
            product(
                &format!("box_{n:03}"),
                &format!("Mystery Box {n:03}"),
                category,
                &[brand],
                i64::from(n) * 1000,
                &format!("2026-02-{day:02}T00:00:00Z"),
            )
        })
        .collect()
}

// =============================================================================
// Request routing
// =============================================================================

struct Router {
    state: Arc<Mutex<ShopState>>,
}

impl Respond for Router {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((status, message)) = state.failures.pop_front() {
            return error(status, &message);
        }

        let segments: Vec<String> = request
            .url
            .path_segments()
            .map(|s| s.map(str::to_owned).collect())
            .unwrap_or_default();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);

        match (request.method.as_str(), segments.as_slice()) {
            ("GET", ["store", "products"]) => list_products(&state, request),
            ("GET", ["store", "products", id]) => state
                .products
                .iter()
                .find(|p| p.id.as_str() == *id)
                .map_or_else(
                    || error(404, &format!("Product with id: {id} was not found")),
                    |p| ok(&json!({ "product": p })),
                ),
            ("GET", ["store", "product-categories"]) => {
                let categories = distinct(state.products.iter().flat_map(|p| &p.categories));
                ok(&json!({ "product_categories": categories, "count": categories.len() }))
            }
            ("GET", ["store", "product-categories", id]) => state
                .products
                .iter()
                .flat_map(|p| &p.categories)
                .find(|c| c.id.as_str() == *id)
                .map_or_else(
                    || error(404, &format!("ProductCategory with id: {id} was not found")),
                    |c| ok(&json!({ "product_category": c })),
                ),
            ("GET", ["store", "collections"]) => {
                let collections =
                    distinct(state.products.iter().filter_map(|p| p.collection.as_ref()));
                ok(&json!({ "collections": collections, "count": collections.len() }))
            }
            ("GET", ["store", "collections", id]) => state
                .products
                .iter()
                .filter_map(|p| p.collection.as_ref())
                .find(|c| c.id.as_str() == *id)
                .map_or_else(
                    || error(404, &format!("Collection with id: {id} was not found")),
                    |c| ok(&json!({ "collection": c })),
                ),
            ("POST", ["store", "carts"]) => create_cart(&mut state),
            ("GET", ["store", "carts", id]) => {
                with_cart(&state, id, |cart| ok(&json!({ "cart": cart })))
            }
            ("POST", ["store", "carts", id, "line-items"]) => add_line_item(&mut state, id, &body),
            ("POST", ["store", "carts", id, "line-items", line]) => {
                update_line_item(&mut state, id, line, &body)
            }
            ("DELETE", ["store", "carts", id, "line-items", line]) => {
                remove_line_item(&mut state, id, line)
            }
            ("POST", ["store", "auth", "token"]) => create_token(&state, &body),
            ("DELETE", ["store", "auth"]) => ok(&json!({})),
            ("GET", ["store", "customers", "me"]) => with_account(&mut state, request, |account| {
                ok(&json!({ "customer": account.customer }))
            }),
            ("POST", ["store", "customers"]) => create_customer(&mut state, &body),
            ("POST", ["store", "customers", "me", "addresses"]) => {
                let id = state.next_id("addr");
                with_account(&mut state, request, |account| {
                    add_address(account, &id, &body["address"])
                })
            }
            ("POST", ["store", "customers", "me", "addresses", id]) => {
                with_account(&mut state, request, |account| update_address(account, id, &body))
            }
            ("DELETE", ["store", "customers", "me", "addresses", id]) => {
                with_account(&mut state, request, |account| {
                    account.customer.shipping_addresses.retain(|a| a.id.as_str() != *id);
                    ok(&json!({ "customer": account.customer }))
                })
            }
            _ => error(404, "Route not found"),
        }
    }
}

fn ok(body: &Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

fn error(status: u16, message: &str) -> ResponseTemplate {
    let kind = match status {
        404 => "not_found",
        401 => "unauthorized",
        400..=499 => "invalid_data",
        _ => "unexpected_state",
    };
    ResponseTemplate::new(status).set_body_json(json!({ "type": kind, "message": message }))
}

fn distinct<'a, T: PartialEq + Clone + 'a>(items: impl Iterator<Item = &'a T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::new();
    for item in items {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

fn list_products(state: &ShopState, request: &Request) -> ResponseTemplate {
    let mut q = None;
    let mut handle = None;
    let mut category_ids = Vec::new();
    let mut collection_ids = Vec::new();
    let mut limit = 50_usize;
    let mut offset = 0_usize;
    for (key, value) in request.url.query_pairs() {
        match key.as_ref() {
            "q" => q = Some(value.to_lowercase()),
            "handle" => handle = Some(value.into_owned()),
            "category_id[]" => category_ids.push(value.into_owned()),
            "collection_id[]" => collection_ids.push(value.into_owned()),
            "limit" => limit = value.parse().unwrap_or(limit),
            "offset" => offset = value.parse().unwrap_or(offset),
            _ => {}
        }
    }

    let matching: Vec<&Product> = state
        .products
        .iter()
        .filter(|p| q.as_ref().is_none_or(|q| p.title.to_lowercase().contains(q)))
        .filter(|p| handle.as_ref().is_none_or(|h| &p.handle == h))
        .filter(|p| {
            category_ids.is_empty()
                || p.categories.iter().any(|c| category_ids.contains(&c.id.to_string()))
        })
        .filter(|p| {
            collection_ids.is_empty()
                || p.collection
                    .as_ref()
                    .is_some_and(|c| collection_ids.contains(&c.id.to_string()))
        })
        .collect();

    let page: Vec<&Product> = matching.iter().skip(offset).take(limit).copied().collect();
    ok(&json!({
        "products": page,
        "count": matching.len(),
        "offset": offset,
        "limit": limit,
    }))
}

// =============================================================================
// Carts
// =============================================================================

fn create_cart(state: &mut ShopState) -> ResponseTemplate {
    let id = CartId::new(state.next_id("cart"));
    let cart = Cart {
        id: id.clone(),
        items: Vec::new(),
        region: Some(Region {
            id: RegionId::new(REGION_ID),
            name: Some("United States".to_owned()),
            currency_code: CurrencyCode::new("usd"),
            tax_rate: 0.0,
        }),
        subtotal: 0,
        discount_total: 0,
        shipping_total: 0,
        tax_total: 0,
        total: 0,
    };
    state.carts.insert(id, cart.clone());
    ok(&json!({ "cart": cart }))
}

fn with_cart(
    state: &ShopState,
    id: &str,
    respond: impl FnOnce(&Cart) -> ResponseTemplate,
) -> ResponseTemplate {
    state
        .carts
        .get(&CartId::new(id))
        .map_or_else(|| error(404, &format!("Cart with id: {id} was not found")), respond)
}

fn add_line_item(state: &mut ShopState, cart_id: &str, body: &Value) -> ResponseTemplate {
    let variant_id = VariantId::new(body["variant_id"].as_str().unwrap_or_default());
    let quantity = u32::try_from(body["quantity"].as_u64().unwrap_or(0)).unwrap_or(0);
    if quantity == 0 {
        return error(400, "quantity must be a positive integer");
    }

    let found = state
        .products
        .iter()
        .find_map(|p| p.variant(&variant_id).map(|v| (p.clone(), v.clone())));
    let Some((product, variant)) = found else {
        return error(404, &format!("Variant with id: {variant_id} was not found"));
    };
    let line_id = LineItemId::new(state.next_id("item"));

    let Some(cart) = state.carts.get_mut(&CartId::new(cart_id)) else {
        return error(404, &format!("Cart with id: {cart_id} was not found"));
    };
    match cart.items.iter_mut().find(|i| i.variant.id == variant_id) {
        Some(line) => line.quantity += quantity,
        None => cart.items.push(CartItem {
            id: line_id,
            title: product.title.clone(),
            thumbnail: product.thumbnail.clone(),
            unit_price: variant.prices.first().map_or(0, |p| p.amount),
            variant: CartVariant {
                id: variant.id.clone(),
                title: variant.title.clone(),
                prices: variant.prices.clone(),
            },
            quantity,
            subtotal: 0,
            total: 0,
        }),
    }
    recompute(cart);
    ok(&json!({ "cart": cart }))
}

fn update_line_item(
    state: &mut ShopState,
    cart_id: &str,
    line_id: &str,
    body: &Value,
) -> ResponseTemplate {
    let quantity = u32::try_from(body["quantity"].as_u64().unwrap_or(0)).unwrap_or(0);
    let Some(cart) = state.carts.get_mut(&CartId::new(cart_id)) else {
        return error(404, &format!("Cart with id: {cart_id} was not found"));
    };
    let Some(line) = cart.items.iter_mut().find(|i| i.id.as_str() == line_id) else {
        return error(404, &format!("Line item with id: {line_id} was not found"));
    };
    if quantity == 0 {
        cart.items.retain(|i| i.id.as_str() != line_id);
    } else {
        line.quantity = quantity;
    }
    recompute(cart);
    ok(&json!({ "cart": cart }))
}

fn remove_line_item(state: &mut ShopState, cart_id: &str, line_id: &str) -> ResponseTemplate {
    let Some(cart) = state.carts.get_mut(&CartId::new(cart_id)) else {
        return error(404, &format!("Cart with id: {cart_id} was not found"));
    };
    cart.items.retain(|i| i.id.as_str() != line_id);
    recompute(cart);
    ok(&json!({ "id": line_id, "object": "line-item", "deleted": true, "parent": cart }))
}

fn recompute(cart: &mut Cart) {
    for item in &mut cart.items {
        item.subtotal = item.unit_price * i64::from(item.quantity);
        item.total = item.subtotal;
    }
    cart.subtotal = cart.items.iter().map(|i| i.subtotal).sum();
    cart.total = cart.subtotal + cart.shipping_total + cart.tax_total - cart.discount_total;
}

// =============================================================================
// Customers
// =============================================================================

#[allow(clippy::unwrap_used)]
fn customer_json(id: &str, email: &str, addresses: &[Address]) -> Customer {
    serde_json::from_value(json!({
        "id": id,
        "email": email,
        "first_name": "Test",
        "last_name": "Shopper",
        "has_account": true,
        "shipping_addresses": addresses,
    }))
    .unwrap()
}

fn create_token(state: &ShopState, body: &Value) -> ResponseTemplate {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    match state.accounts.get(email) {
        Some(account) if account.password == password => {
            ok(&json!({ "access_token": format!("{TOKEN_PREFIX}{email}") }))
        }
        _ => error(401, "Invalid email or password"),
    }
}

fn create_customer(state: &mut ShopState, body: &Value) -> ResponseTemplate {
    let email = body["email"].as_str().unwrap_or_default().to_owned();
    if state.accounts.contains_key(&email) {
        return error(
            422,
            "A customer with the given email already has an account. Log in instead.",
        );
    }
    let id = state.next_id("cus");
    let mut customer = customer_json(&id, &email, &[]);
    customer.first_name = body["first_name"].as_str().map(str::to_owned);
    customer.last_name = body["last_name"].as_str().map(str::to_owned);
    let password = body["password"].as_str().unwrap_or_default().to_owned();

    let response = ok(&json!({ "customer": customer }));
    state.accounts.insert(email, Account { password, customer });
    response
}

fn with_account(
    state: &mut ShopState,
    request: &Request,
    respond: impl FnOnce(&mut Account) -> ResponseTemplate,
) -> ResponseTemplate {
    let email = request
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| token.strip_prefix(TOKEN_PREFIX))
        .map(str::to_owned);
    match email.and_then(|email| state.accounts.get_mut(&email)) {
        Some(account) => respond(account),
        None => error(401, "Unauthorized"),
    }
}

fn add_address(account: &mut Account, id: &str, input: &Value) -> ResponseTemplate {
    let mut fields = input.clone();
    fields["id"] = json!(id);
    match serde_json::from_value::<Address>(fields) {
        Ok(address) => {
            account.customer.shipping_addresses.push(address);
            ok(&json!({ "customer": account.customer }))
        }
        Err(e) => error(400, &e.to_string()),
    }
}

fn update_address(account: &mut Account, id: &str, body: &Value) -> ResponseTemplate {
    let Some(address) = account
        .customer
        .shipping_addresses
        .iter_mut()
        .find(|a| a.id == AddressId::new(id))
    else {
        return error(404, &format!("Address with id: {id} was not found"));
    };

    if let Some(metadata) = body.get("metadata").and_then(Value::as_object) {
        let merged = address.metadata.get_or_insert_with(serde_json::Map::new);
        for (key, value) in metadata {
            merged.insert(key.clone(), value.clone());
        }
    } else {
        let mut fields = body.clone();
        fields["id"] = json!(id);
        fields["metadata"] = json!(address.metadata);
        match serde_json::from_value::<Address>(fields) {
            Ok(updated) => *address = updated,
            Err(e) => return error(400, &e.to_string()),
        }
    }
    ok(&json!({ "customer": account.customer }))
}
