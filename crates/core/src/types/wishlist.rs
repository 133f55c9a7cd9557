//! Wishlist entries.
//!
//! The wishlist lives only on the client. Entries are keyed by variant ID and
//! carry a denormalised copy of what is needed to render them without a
//! catalog round trip.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ProductId, VariantId};
use super::money::{CurrencyCode, Money};
use super::product::{Product, ProductVariant};

/// A saved variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistItem {
    /// Local identifier, derived from the variant ID.
    pub id: String,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub title: String,
    pub variant_title: String,
    pub thumbnail: Option<String>,
    /// Price in minor units at the time the item was saved.
    pub price: i64,
    pub currency_code: CurrencyCode,
    pub handle: String,
    pub added_at: DateTime<Utc>,
}

impl WishlistItem {
    /// Build an entry for `variant` of `product`, priced in `currency_code`.
    ///
    /// Falls back to the variant's first price when it has none in the
    /// requested currency, and to zero when it has no prices at all.
    #[must_use]
    pub fn from_variant(
        product: &Product,
        variant: &ProductVariant,
        currency_code: &CurrencyCode,
        now: DateTime<Utc>,
    ) -> Self {
        let price = variant
            .price_in(currency_code)
            .or_else(|| variant.prices.first().map(super::VariantPrice::money))
            .unwrap_or_else(|| Money::new(0, currency_code.clone()));

        Self {
            id: format!("wish_{}", variant.id),
            product_id: product.id.clone(),
            variant_id: variant.id.clone(),
            title: product.title.clone(),
            variant_title: variant.title.clone(),
            thumbnail: product.thumbnail.clone(),
            price: price.amount,
            currency_code: price.currency_code,
            handle: product.handle.clone(),
            added_at: now,
        }
    }

    /// The saved price as [`Money`].
    #[must_use]
    pub fn money(&self) -> Money {
        Money::new(self.price, self.currency_code.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_variant_prefers_requested_currency() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": "prod_1",
            "title": "Mystery Box",
            "handle": "mystery-box",
            "thumbnail": "https://cdn.example.com/box.png",
            "variants": [{
                "id": "variant_1",
                "title": "Large",
                "prices": [
                    { "amount": 2500, "currency_code": "usd" },
                    { "amount": 2300, "currency_code": "eur" }
                ]
            }]
        }))
        .unwrap();

        let now = Utc::now();
        let item = WishlistItem::from_variant(
            &product,
            &product.variants[0],
            &CurrencyCode::new("eur"),
            now,
        );

        assert_eq!(item.id, "wish_variant_1");
        assert_eq!(item.money().display(), "€23.00");
        assert_eq!(item.handle, "mystery-box");
        assert_eq!(item.added_at, now);

        let fallback = WishlistItem::from_variant(
            &product,
            &product.variants[0],
            &CurrencyCode::new("gbp"),
            now,
        );
        assert_eq!(fallback.money().display(), "$25.00");
    }
}
