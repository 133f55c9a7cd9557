//! Listing sort orders.
//!
//! Every order is stable: products that compare equal keep their input order.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use mystery_box_core::Product;

/// How a listing is ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Backend order.
    #[default]
    Featured,
    /// Search ranking; backend order without a query.
    Relevance,
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
    /// Most recently created first.
    Newest,
}

impl SortKey {
    pub const ALL: [Self; 7] = [
        Self::Featured,
        Self::Relevance,
        Self::PriceAsc,
        Self::PriceDesc,
        Self::NameAsc,
        Self::NameDesc,
        Self::Newest,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Featured => "featured",
            Self::Relevance => "relevance",
            Self::PriceAsc => "price-asc",
            Self::PriceDesc => "price-desc",
            Self::NameAsc => "name-asc",
            Self::NameDesc => "name-desc",
            Self::Newest => "newest",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == s)
    }

    /// Human-readable label for menus.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Featured => "Featured",
            Self::Relevance => "Relevance",
            Self::PriceAsc => "Price: Low to High",
            Self::PriceDesc => "Price: High to Low",
            Self::NameAsc => "Name: A to Z",
            Self::NameDesc => "Name: Z to A",
            Self::Newest => "Newest",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown sort: {s}"))
    }
}

/// Sort `products` in place. `query` only affects [`SortKey::Relevance`].
pub fn sort_products(products: &mut [&Product], key: SortKey, query: Option<&str>) {
    match key {
        SortKey::Featured => {}
        SortKey::Relevance => {
            if let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) {
                let needle = query.to_lowercase();
                products.sort_by_cached_key(|p| {
                    let starts = p.title.to_lowercase().starts_with(&needle);
                    (!starts, p.title.chars().count())
                });
            }
        }
        SortKey::PriceAsc => products.sort_by(|a, b| by_price(a, b, false)),
        SortKey::PriceDesc => products.sort_by(|a, b| by_price(a, b, true)),
        SortKey::NameAsc => products.sort_by_cached_key(|p| p.title.to_lowercase()),
        SortKey::NameDesc => {
            products.sort_by(|a, b| b.title.to_lowercase().cmp(&a.title.to_lowercase()));
        }
        SortKey::Newest => products.sort_by(|a, b| match (a.created_at, b.created_at) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
    }
}

/// Compare by first-variant price; unpriced products always sort last.
fn by_price(a: &Product, b: &Product, descending: bool) -> Ordering {
    match (a.sort_price(), b.sort_price()) {
        (Some(a), Some(b)) if descending => b.amount.cmp(&a.amount),
        (Some(a), Some(b)) => a.amount.cmp(&b.amount),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
