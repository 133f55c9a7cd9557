//! Listing state as URL query parameters.
//!
//! Listing pages keep their state in the query string (`page`, `sort`,
//! `minPrice`, `maxPrice`, `category`, `q`), so a listing can be bookmarked
//! or shared. Malformed values are dropped rather than rejected.

use std::str::FromStr;

use rust_decimal::Decimal;
use url::form_urlencoded;

use super::sort::SortKey;

/// Parsed listing query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    /// 1-based page, defaulting to 1.
    pub page: u32,
    pub sort: SortKey,
    /// Lower price bound in major units.
    pub min_price: Option<Decimal>,
    /// Upper price bound in major units.
    pub max_price: Option<Decimal>,
    /// Selected category handles (`category` may repeat).
    pub categories: Vec<String>,
    pub q: Option<String>,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            page: 1,
            sort: SortKey::default(),
            min_price: None,
            max_price: None,
            categories: Vec::new(),
            q: None,
        }
    }
}

impl ListingQuery {
    /// Parse a query string, with or without the leading `?`.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut parsed = Self::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            match key.as_ref() {
                "page" => {
                    parsed.page = value.parse().ok().filter(|p| *p >= 1).unwrap_or(1);
                }
                "sort" => parsed.sort = SortKey::parse(value).unwrap_or_default(),
                "minPrice" => parsed.min_price = parse_price(value),
                "maxPrice" => parsed.max_price = parse_price(value),
                "category" if !value.is_empty() => {
                    if !parsed.categories.iter().any(|c| c == value) {
                        parsed.categories.push(value.to_owned());
                    }
                }
                "q" if !value.is_empty() => parsed.q = Some(value.to_owned()),
                other => tracing::trace!(key = other, "Ignoring listing query parameter"),
            }
        }

        parsed
    }

    /// Serialise to a query string (without `?`), omitting defaults.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut out = form_urlencoded::Serializer::new(String::new());
        if let Some(q) = &self.q {
            out.append_pair("q", q);
        }
        for category in &self.categories {
            out.append_pair("category", category);
        }
        if let Some(min) = self.min_price {
            out.append_pair("minPrice", &min.normalize().to_string());
        }
        if let Some(max) = self.max_price {
            out.append_pair("maxPrice", &max.normalize().to_string());
        }
        if self.sort != SortKey::default() {
            out.append_pair("sort", self.sort.as_str());
        }
        if self.page > 1 {
            out.append_pair("page", &self.page.to_string());
        }
        out.finish()
    }
}

fn parse_price(value: &str) -> Option<Decimal> {
    Decimal::from_str(value)
        .ok()
        .filter(|price| !price.is_sign_negative())
}
