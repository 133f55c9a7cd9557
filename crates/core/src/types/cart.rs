//! Cart types.
//!
//! A [`Cart`] is always replaced wholesale with the backend's latest response;
//! its totals are server-computed and treated as opaque. Nothing in this
//! module sums prices.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::{CartId, LineItemId, RegionId, VariantId};
use super::money::{CurrencyCode, Money};
use super::product::VariantPrice;

/// Pricing region the cart belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    #[serde(default)]
    pub name: Option<String>,
    pub currency_code: CurrencyCode,
    /// Tax rate as a percentage (e.g. `8.5`).
    #[serde(default)]
    pub tax_rate: f64,
}

/// The variant a cart line refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartVariant {
    pub id: VariantId,
    pub title: String,
    #[serde(default)]
    pub prices: Vec<VariantPrice>,
}

/// A line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: LineItemId,
    pub title: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    pub variant: CartVariant,
    pub quantity: u32,
    /// Unit price in minor units.
    pub unit_price: i64,
    #[serde(default)]
    pub subtotal: i64,
    #[serde(default)]
    pub total: i64,
}

/// A shopping cart as returned by the commerce backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub region: Option<Region>,
    #[serde(default)]
    pub subtotal: i64,
    #[serde(default)]
    pub discount_total: i64,
    #[serde(default)]
    pub shipping_total: i64,
    #[serde(default)]
    pub tax_total: i64,
    #[serde(default)]
    pub total: i64,
}

impl Cart {
    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find a line by its ID.
    #[must_use]
    pub fn find_item(&self, item_id: &LineItemId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.id == item_id)
    }

    /// Find the line holding a given variant.
    #[must_use]
    pub fn find_variant(&self, variant_id: &VariantId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.variant.id == variant_id)
    }

    /// Currency of the cart's region (USD when the backend omits the region).
    #[must_use]
    pub fn currency_code(&self) -> CurrencyCode {
        self.region
            .as_ref()
            .map(|r| r.currency_code.clone())
            .unwrap_or_default()
    }

    /// A server-computed total as [`Money`] in the cart's currency.
    #[must_use]
    pub fn money(&self, amount: i64) -> Money {
        Money::new(amount, self.currency_code())
    }
}

/// Error for quantities outside the allowed range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("quantity must be between {min} and {max} (got {got})", min = Quantity::MIN, max = Quantity::MAX)]
pub struct QuantityError {
    /// The rejected value.
    pub got: u32,
}

/// A line quantity, bounded to `1..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// Smallest orderable quantity.
    pub const MIN: u32 = 1;
    /// Largest quantity a single line may hold.
    pub const MAX: u32 = 10;

    /// Validate a quantity.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError` if `value` is outside `1..=10`.
    pub const fn new(value: u32) -> Result<Self, QuantityError> {
        if value < Self::MIN || value > Self::MAX {
            return Err(QuantityError { got: value });
        }
        Ok(Self(value))
    }

    /// The underlying value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self {
        q.0
    }
}
