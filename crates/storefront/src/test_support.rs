//! In-process fake backend for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mystery_box_core::{
    Address, AddressId, AddressInput, Cart, CartId, CartItem, CartVariant, Category, CategoryId,
    Collection, CollectionId, Customer, CustomerId, DEFAULT_ADDRESS_KEY, Email, LineItemId,
    Product, ProductId, RegionId, VariantId,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use crate::api::{
    ApiError, CategoryList, CollectionList, CommerceBackend, NewCustomer, ProductList,
    ProductQuery,
};

const UNIT_PRICE: i64 = 2500;

#[derive(Default)]
struct State {
    carts: HashMap<CartId, Cart>,
    next_id: u32,
    accounts: HashMap<String, (String, Customer)>,
    tokens: HashMap<String, String>,
}

/// Records every call and keeps carts and accounts in memory.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<State>,
    calls: Mutex<Vec<&'static str>>,
    products: Vec<Product>,
    latencies: Mutex<VecDeque<Duration>>,
    offline: AtomicBool,
    failures: Mutex<HashMap<&'static str, ApiError>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            products,
            ..Self::default()
        }
    }

    /// Make every subsequent call fail with a connection error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail the next call to `call` with `error`.
    pub fn fail_next(&self, call: &'static str, error: ApiError) {
        self.failures.lock().unwrap().insert(call, error);
    }

    /// Delay the next cart mutations by these durations, in call order.
    pub fn push_latencies(&self, latencies: impl IntoIterator<Item = Duration>) {
        self.latencies.lock().unwrap().extend(latencies);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    /// Forget a cart server-side, as if it had expired.
    pub fn expire_cart(&self, id: &CartId) {
        self.state.lock().unwrap().carts.remove(id);
    }

    pub fn server_cart(&self, id: &CartId) -> Option<Cart> {
        self.state.lock().unwrap().carts.get(id).cloned()
    }

    pub fn register_account(&self, email: &str, password: &str) -> Customer {
        let customer = customer(email, Vec::new());
        self.state.lock().unwrap().accounts.insert(
            email.to_owned(),
            (password.to_owned(), customer.clone()),
        );
        customer
    }

    fn record(&self, call: &'static str) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(call);
        if self.offline.load(Ordering::SeqCst) {
            return Err(ApiError::Connection("connection refused".into()));
        }
        match self.failures.lock().unwrap().remove(call) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn latency(&self) {
        let delay = self.latencies.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn with_cart(
        &self,
        cart_id: &CartId,
        f: impl FnOnce(&mut Cart, &mut u32),
    ) -> Result<Cart, ApiError> {
        let mut state = self.state.lock().unwrap();
        let State { carts, next_id, .. } = &mut *state;
        let cart = carts
            .get_mut(cart_id)
            .ok_or_else(|| ApiError::NotFound(format!("Cart with id: {cart_id} was not found")))?;
        f(cart, next_id);
        recompute(cart);
        Ok(cart.clone())
    }

    fn customer_for(&self, token: &SecretString) -> Result<Customer, ApiError> {
        let state = self.state.lock().unwrap();
        state
            .tokens
            .get(token.expose_secret())
            .and_then(|email| state.accounts.get(email))
            .map(|(_, c)| c.clone())
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized".into()))
    }

    fn update_customer(
        &self,
        token: &SecretString,
        f: impl FnOnce(&mut Customer, u32),
    ) -> Result<Customer, ApiError> {
        let mut state = self.state.lock().unwrap();
        let email = state
            .tokens
            .get(token.expose_secret())
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized".into()))?;
        state.next_id += 1;
        let id = state.next_id;
        let (_, customer) = state
            .accounts
            .get_mut(&email)
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized".into()))?;
        f(customer, id);
        Ok(customer.clone())
    }
}

fn recompute(cart: &mut Cart) {
    for item in &mut cart.items {
        item.subtotal = item.unit_price * i64::from(item.quantity);
        item.total = item.subtotal;
    }
    cart.subtotal = cart.items.iter().map(|i| i.subtotal).sum();
    cart.total = cart.subtotal;
}

pub fn customer(email: &str, shipping_addresses: Vec<Address>) -> Customer {
    Customer {
        id: CustomerId::new(format!("cus_{email}")),
        email: Email::parse(email).unwrap(),
        first_name: Some("Jane".into()),
        last_name: Some("Doe".into()),
        phone: None,
        has_account: true,
        shipping_addresses,
        billing_address_id: None,
        metadata: None,
    }
}

fn address_from(id: AddressId, input: &AddressInput) -> Address {
    Address {
        id,
        first_name: Some(input.first_name.clone()),
        last_name: Some(input.last_name.clone()),
        company: input.company.clone(),
        address_1: Some(input.address_1.clone()),
        address_2: input.address_2.clone(),
        city: Some(input.city.clone()),
        province: input.province.clone(),
        postal_code: Some(input.postal_code.clone()),
        country_code: Some(input.country_code.clone()),
        phone: input.phone.clone(),
        metadata: None,
    }
}

/// A minimal product with one variant per `(variant_id, price)` pair.
pub fn product(id: &str, title: &str, variants: &[(&str, i64)]) -> Product {
    serde_json::from_value(json!({
        "id": id,
        "title": title,
        "handle": title.to_lowercase().replace(' ', "-"),
        "variants": variants.iter().map(|(vid, amount)| json!({
            "id": vid,
            "title": "Default",
            "prices": [{ "amount": amount, "currency_code": "usd" }],
            "inventory_quantity": 5
        })).collect::<Vec<_>>()
    }))
    .unwrap()
}

#[async_trait]
impl CommerceBackend for MockBackend {
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductList, ApiError> {
        self.record("list_products")?;
        let matching: Vec<Product> = self
            .products
            .iter()
            .filter(|p| query.handle.as_ref().is_none_or(|h| &p.handle == h))
            .cloned()
            .collect();
        let count = u32::try_from(matching.len()).unwrap();
        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(50);
        Ok(ProductList {
            products: matching
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect(),
            count,
            offset,
            limit,
        })
    }

    async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        self.record("get_product")?;
        self.products
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Product {id} not found")))
    }

    async fn get_product_by_handle(&self, handle: &str) -> Result<Product, ApiError> {
        self.record("get_product_by_handle")?;
        self.products
            .iter()
            .find(|p| p.handle == handle)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Product not found: {handle}")))
    }

    async fn list_categories(&self) -> Result<CategoryList, ApiError> {
        self.record("list_categories")?;
        Ok(CategoryList {
            categories: Vec::new(),
            count: 0,
        })
    }

    async fn get_category(&self, id: &CategoryId) -> Result<Category, ApiError> {
        self.record("get_category")?;
        Err(ApiError::NotFound(format!("Category {id} not found")))
    }

    async fn list_collections(&self) -> Result<CollectionList, ApiError> {
        self.record("list_collections")?;
        Ok(CollectionList {
            collections: Vec::new(),
            count: 0,
        })
    }

    async fn get_collection(&self, id: &CollectionId) -> Result<Collection, ApiError> {
        self.record("get_collection")?;
        Err(ApiError::NotFound(format!("Collection {id} not found")))
    }

    async fn create_cart(&self, _region_id: Option<&RegionId>) -> Result<Cart, ApiError> {
        self.record("create_cart")?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let cart: Cart =
            serde_json::from_value(json!({ "id": format!("cart_{}", state.next_id) })).unwrap();
        state.carts.insert(cart.id.clone(), cart.clone());
        Ok(cart)
    }

    async fn get_cart(&self, id: &CartId) -> Result<Cart, ApiError> {
        self.record("get_cart")?;
        self.with_cart(id, |_, _| {})
    }

    async fn add_line_item(
        &self,
        cart_id: &CartId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<Cart, ApiError> {
        self.record("add_line_item")?;
        self.latency().await;
        let unit_price = self
            .products
            .iter()
            .find_map(|p| p.variant(variant_id))
            .and_then(|v| v.prices.first())
            .map_or(UNIT_PRICE, |p| p.amount);

        self.with_cart(cart_id, |cart, next_id| {
            if let Some(item) = cart.items.iter_mut().find(|i| &i.variant.id == variant_id) {
                item.quantity += quantity;
                return;
            }
            *next_id += 1;
            cart.items.push(CartItem {
                id: LineItemId::new(format!("item_{next_id}")),
                title: "Mystery Box".into(),
                thumbnail: None,
                variant: CartVariant {
                    id: variant_id.clone(),
                    title: "Default".into(),
                    prices: Vec::new(),
                },
                quantity,
                unit_price,
                subtotal: 0,
                total: 0,
            });
        })
    }

    async fn update_line_item(
        &self,
        cart_id: &CartId,
        item_id: &LineItemId,
        quantity: u32,
    ) -> Result<Cart, ApiError> {
        self.record("update_line_item")?;
        self.latency().await;
        self.with_cart(cart_id, |cart, _| {
            if let Some(item) = cart.items.iter_mut().find(|i| &i.id == item_id) {
                item.quantity = quantity;
            }
        })
    }

    async fn remove_line_item(
        &self,
        cart_id: &CartId,
        item_id: &LineItemId,
    ) -> Result<Cart, ApiError> {
        self.record("remove_line_item")?;
        self.latency().await;
        self.with_cart(cart_id, |cart, _| cart.items.retain(|i| &i.id != item_id))
    }

    async fn create_session(&self, email: &str, password: &str) -> Result<SecretString, ApiError> {
        self.record("create_session")?;
        let mut state = self.state.lock().unwrap();
        match state.accounts.get(email) {
            Some((stored, _)) if stored == password => {
                let token = format!("jwt_{email}");
                state.tokens.insert(token.clone(), email.to_owned());
                Ok(SecretString::from(token))
            }
            _ => Err(ApiError::Unauthorized("Invalid email or password".into())),
        }
    }

    async fn delete_session(&self, token: &SecretString) -> Result<(), ApiError> {
        self.record("delete_session")?;
        self.state
            .lock()
            .unwrap()
            .tokens
            .remove(token.expose_secret());
        Ok(())
    }

    async fn get_customer(&self, token: &SecretString) -> Result<Customer, ApiError> {
        self.record("get_customer")?;
        self.customer_for(token)
    }

    async fn create_customer(&self, input: &NewCustomer) -> Result<Customer, ApiError> {
        self.record("create_customer")?;
        if self.state.lock().unwrap().accounts.contains_key(&input.email) {
            return Err(ApiError::Status {
                status: 422,
                message: "Customer with this email already exists".into(),
            });
        }
        Ok(self.register_account(&input.email, &input.password))
    }

    async fn add_address(
        &self,
        token: &SecretString,
        address: &AddressInput,
    ) -> Result<Customer, ApiError> {
        self.record("add_address")?;
        self.update_customer(token, |customer, id| {
            customer
                .shipping_addresses
                .push(address_from(AddressId::new(format!("addr_{id}")), address));
        })
    }

    async fn update_address(
        &self,
        token: &SecretString,
        id: &AddressId,
        address: &AddressInput,
    ) -> Result<Customer, ApiError> {
        self.record("update_address")?;
        self.update_customer(token, |customer, _| {
            if let Some(existing) = customer.shipping_addresses.iter_mut().find(|a| &a.id == id) {
                let metadata = existing.metadata.take();
                *existing = address_from(id.clone(), address);
                existing.metadata = metadata;
            }
        })
    }

    async fn delete_address(
        &self,
        token: &SecretString,
        id: &AddressId,
    ) -> Result<Customer, ApiError> {
        self.record("delete_address")?;
        self.update_customer(token, |customer, _| {
            customer.shipping_addresses.retain(|a| &a.id != id);
        })
    }

    async fn set_default_address(
        &self,
        token: &SecretString,
        id: &AddressId,
    ) -> Result<Customer, ApiError> {
        self.record("set_default_address")?;
        self.update_customer(token, |customer, _| {
            for address in &mut customer.shipping_addresses {
                let is_default = &address.id == id;
                address
                    .metadata
                    .get_or_insert_with(Default::default)
                    .insert(DEFAULT_ADDRESS_KEY.to_owned(), is_default.into());
            }
        })
    }
}
