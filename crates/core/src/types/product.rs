//! Catalog types: products, variants, options, categories and collections.
//!
//! These are read-only projections of the commerce backend's catalog. The
//! field names follow the backend's JSON so the types deserialize directly
//! from API responses.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{CategoryId, CollectionId, OptionId, ProductId, VariantId};
use super::money::{CurrencyCode, Money};

/// A (possibly partial) selection of option values, keyed by option ID.
pub type OptionSelection = BTreeMap<OptionId, String>;

// =============================================================================
// Taxonomy
// =============================================================================

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub handle: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_category_id: Option<CategoryId>,
}

/// A curated product collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub title: String,
    pub handle: String,
}

/// A free-form product tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTag {
    #[serde(default)]
    pub id: Option<String>,
    pub value: String,
}

/// A product type (e.g. "Phone", "Accessory").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductType {
    #[serde(default)]
    pub id: Option<String>,
    pub value: String,
}

// =============================================================================
// Options & Variants
// =============================================================================

/// One allowed value of a product option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionValue {
    #[serde(default)]
    pub id: Option<String>,
    pub value: String,
}

/// Product option definition (e.g. "Size" with values S/M/L).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    pub id: OptionId,
    pub title: String,
    #[serde(default)]
    pub values: Vec<OptionValue>,
}

/// The value a variant takes for one option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantOptionValue {
    pub option_id: OptionId,
    pub value: String,
}

/// A variant price in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantPrice {
    /// Amount in minor units.
    pub amount: i64,
    pub currency_code: CurrencyCode,
}

impl VariantPrice {
    /// The price as [`Money`].
    #[must_use]
    pub fn money(&self) -> Money {
        Money::new(self.amount, self.currency_code.clone())
    }
}

/// A purchasable configuration of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: VariantId,
    pub title: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub prices: Vec<VariantPrice>,
    #[serde(default)]
    pub inventory_quantity: i64,
    #[serde(default)]
    pub allow_backorder: bool,
    #[serde(default = "default_manage_inventory")]
    pub manage_inventory: bool,
    #[serde(default)]
    pub options: Vec<VariantOptionValue>,
}

const fn default_manage_inventory() -> bool {
    true
}

impl ProductVariant {
    /// The value this variant takes for `option_id`.
    #[must_use]
    pub fn option_value(&self, option_id: &OptionId) -> Option<&str> {
        self.options
            .iter()
            .find(|o| &o.option_id == option_id)
            .map(|o| o.value.as_str())
    }

    /// Whether this variant agrees with every entry of `selection`.
    #[must_use]
    pub fn matches(&self, selection: &OptionSelection) -> bool {
        selection
            .iter()
            .all(|(option_id, value)| self.option_value(option_id) == Some(value.as_str()))
    }

    /// Whether the variant can be added to a cart right now.
    #[must_use]
    pub const fn is_purchasable(&self) -> bool {
        !self.manage_inventory || self.inventory_quantity > 0 || self.allow_backorder
    }

    /// Price in a specific currency.
    #[must_use]
    pub fn price_in(&self, currency_code: &CurrencyCode) -> Option<Money> {
        self.prices
            .iter()
            .find(|p| &p.currency_code == currency_code)
            .map(VariantPrice::money)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub handle: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub is_giftcard: bool,
    #[serde(default)]
    pub tags: Vec<ProductTag>,
    #[serde(default, rename = "type")]
    pub product_type: Option<ProductType>,
    #[serde(default)]
    pub collection: Option<Collection>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub options: Vec<ProductOption>,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Product {
    /// Variants consistent with a (possibly partial) option selection.
    pub fn matching_variants<'a>(
        &'a self,
        selection: &'a OptionSelection,
    ) -> impl Iterator<Item = &'a ProductVariant> + 'a {
        self.variants.iter().filter(move |v| v.matches(selection))
    }

    /// The variant matching a complete option selection.
    ///
    /// Returns `None` if any of the product's options is unselected or no
    /// variant carries the selected combination.
    #[must_use]
    pub fn select_variant(&self, selection: &OptionSelection) -> Option<&ProductVariant> {
        if self.options.iter().any(|o| !selection.contains_key(&o.id)) {
            return None;
        }
        self.variants.iter().find(|v| v.matches(selection))
    }

    /// Whether some variant matching `selection` is in stock or backorderable.
    #[must_use]
    pub fn is_available(&self, selection: &OptionSelection) -> bool {
        self.matching_variants(selection)
            .any(ProductVariant::is_purchasable)
    }

    /// Look up a variant by ID.
    #[must_use]
    pub fn variant(&self, variant_id: &VariantId) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| &v.id == variant_id)
    }

    /// Find an option by its title, case-insensitively.
    #[must_use]
    pub fn option_by_title(&self, title: &str) -> Option<&ProductOption> {
        self.options
            .iter()
            .find(|o| o.title.eq_ignore_ascii_case(title))
    }

    /// Distinct values the product's variants take for the option titled `title`.
    #[must_use]
    pub fn option_values(&self, title: &str) -> Vec<&str> {
        let Some(option) = self.option_by_title(title) else {
            return Vec::new();
        };
        let mut values: Vec<&str> = self
            .variants
            .iter()
            .filter_map(|v| v.option_value(&option.id))
            .collect();
        values.sort_unstable();
        values.dedup();
        values
    }

    /// Price used for sorting and price filters: the first variant's first price.
    #[must_use]
    pub fn sort_price(&self) -> Option<Money> {
        self.variants
            .first()
            .and_then(|v| v.prices.first())
            .map(VariantPrice::money)
    }

    /// Lowest and highest variant price in `currency_code`.
    #[must_use]
    pub fn price_range(&self, currency_code: &CurrencyCode) -> Option<(Money, Money)> {
        let amounts = self
            .variants
            .iter()
            .filter_map(|v| v.price_in(currency_code))
            .map(|m| m.amount);

        let (min, max) = amounts.fold(None, |acc: Option<(i64, i64)>, amount| {
            Some(acc.map_or((amount, amount), |(lo, hi)| (lo.min(amount), hi.max(amount))))
        })?;

        Some((
            Money::new(min, currency_code.clone()),
            Money::new(max, currency_code.clone()),
        ))
    }

    /// Handles of the categories this product belongs to.
    pub fn category_handles(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.handle.as_str())
    }

    /// Tag values attached to this product.
    pub fn tag_values(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.value.as_str())
    }
}
