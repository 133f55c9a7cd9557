//! Request parameters and response envelopes for the store REST API.
//!
//! Domain types live in `mystery-box-core`; this module only covers the
//! wire-level wrappers around them.

use mystery_box_core::{
    AddressInput, Cart, Category, CategoryId, Collection, CollectionId, Customer, Product,
    RegionId, VariantId,
};
use serde::{Deserialize, Serialize};
use url::Url;

// =============================================================================
// Query Parameters
// =============================================================================

/// Filters for the product list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    /// Free-text search.
    pub q: Option<String>,
    /// Exact handle match.
    pub handle: Option<String>,
    pub category_ids: Vec<CategoryId>,
    pub collection_ids: Vec<CollectionId>,
    /// Region used for price calculation.
    pub region_id: Option<RegionId>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ProductQuery {
    /// Query matching a single handle.
    #[must_use]
    pub fn by_handle(handle: &str) -> Self {
        Self {
            handle: Some(handle.to_owned()),
            limit: Some(1),
            ..Self::default()
        }
    }

    /// The query as ordered key/value pairs, arrays in `key[]` form.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(q) = &self.q {
            pairs.push(("q", q.clone()));
        }
        if let Some(handle) = &self.handle {
            pairs.push(("handle", handle.clone()));
        }
        pairs.extend(
            self.category_ids
                .iter()
                .map(|id| ("category_id[]", id.to_string())),
        );
        pairs.extend(
            self.collection_ids
                .iter()
                .map(|id| ("collection_id[]", id.to_string())),
        );
        if let Some(region_id) = &self.region_id {
            pairs.push(("region_id", region_id.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        pairs
    }

    /// Append the query's parameters to `url`.
    pub fn apply_to(&self, url: &mut Url) {
        let pairs = self.pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
    }

    /// Stable cache key for this query.
    #[must_use]
    pub fn cache_key(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs())
            .finish()
    }
}

// =============================================================================
// Response Envelopes
// =============================================================================

/// A page of products with the total match count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductList {
    pub products: Vec<Product>,
    pub count: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProductEnvelope {
    pub product: Product,
}

/// All categories with their count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryList {
    #[serde(rename = "product_categories")]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Deserialize)]
pub(super) struct CategoryEnvelope {
    pub product_category: Category,
}

/// All collections with their count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionList {
    pub collections: Vec<Collection>,
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Deserialize)]
pub(super) struct CollectionEnvelope {
    pub collection: Collection,
}

#[derive(Debug, Deserialize)]
pub(super) struct CartEnvelope {
    /// Line-item deletion returns the updated cart as `parent`.
    #[serde(alias = "parent")]
    pub cart: Cart,
}

#[derive(Debug, Deserialize)]
pub(super) struct CustomerEnvelope {
    pub customer: Customer,
}

#[derive(Debug, Deserialize)]
pub(super) struct TokenEnvelope {
    pub access_token: String,
}

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

// =============================================================================
// Request Bodies
// =============================================================================

#[derive(Debug, Serialize)]
pub(super) struct CreateCartBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_id: Option<&'a RegionId>,
}

#[derive(Debug, Serialize)]
pub(super) struct AddLineItemBody<'a> {
    pub variant_id: &'a VariantId,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub(super) struct UpdateLineItemBody {
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub(super) struct CredentialsBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Registration payload.
#[derive(Debug, Clone, Serialize)]
pub struct NewCustomer {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct AddressBody<'a> {
    pub address: &'a AddressInput,
}

#[derive(Debug, Serialize)]
pub(super) struct AddressMetadataBody {
    pub metadata: serde_json::Map<String, serde_json::Value>,
}
