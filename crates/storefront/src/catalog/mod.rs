//! Client-side catalog listing: search, filters, sort and pagination.
//!
//! Listings run over products already fetched from the backend. The pipeline
//! is search, then filters, then sort, then pagination.

mod filter;
mod listing;
mod paginate;
mod query;
mod sort;

pub use filter::{FilterGroup, FilterState, facet_counts, matches_query};
pub use listing::{Listing, ListingState};
pub use paginate::{Page, paginate, total_pages};
pub use query::ListingQuery;
pub use sort::{SortKey, sort_products};

use mystery_box_core::Product;

/// Products per listing page.
pub const DEFAULT_PAGE_SIZE: usize = 12;

/// Search, filter and sort `products`.
#[must_use]
pub fn apply<'a>(
    products: &'a [Product],
    filters: &FilterState,
    sort: SortKey,
    query: Option<&str>,
) -> Vec<&'a Product> {
    let mut matched: Vec<&Product> = products
        .iter()
        .filter(|product| query.is_none_or(|q| matches_query(product, q)))
        .filter(|product| filters.matches(product))
        .collect();
    sort_products(&mut matched, sort, query);
    matched
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_search_then_filter_then_sort() {
        let products: Vec<Product> = serde_json::from_value(json!([
            { "id": "a", "title": "Mystery Box Large", "handle": "a", "tags": [{ "value": "gift" }] },
            { "id": "b", "title": "Plain Crate", "handle": "b", "tags": [{ "value": "gift" }] },
            { "id": "c", "title": "Mystery Box", "handle": "c", "tags": [{ "value": "gift" }] },
            { "id": "d", "title": "Mystery Bag", "handle": "d", "tags": [{ "value": "sale" }] }
        ]))
        .unwrap();

        let mut filters = FilterState::new();
        filters.select(FilterGroup::Tag, "gift");

        let ids: Vec<&str> = apply(&products, &filters, SortKey::Relevance, Some("mystery"))
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, vec!["c", "a"]);
    }
}
