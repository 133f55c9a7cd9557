//! Listing page state: filters, sort, search and current page.

use mystery_box_core::Product;
use rust_decimal::Decimal;

use super::filter::{FilterGroup, FilterState};
use super::paginate::{Page, paginate};
use super::query::ListingQuery;
use super::sort::SortKey;

/// Mutable state behind a product listing.
///
/// Every change to what is shown (filters, price range, sort, search) sends
/// the shopper back to page 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingState {
    filters: FilterState,
    sort: SortKey,
    page: u32,
    query: Option<String>,
}

impl Default for ListingState {
    fn default() -> Self {
        Self {
            filters: FilterState::default(),
            sort: SortKey::default(),
            page: 1,
            query: None,
        }
    }
}

impl ListingState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore state from URL query parameters.
    #[must_use]
    pub fn from_query(query: &ListingQuery) -> Self {
        let mut filters = FilterState::new();
        filters.set_group(FilterGroup::Category, query.categories.iter().cloned());
        filters.min_price = query.min_price;
        filters.max_price = query.max_price;

        Self {
            filters,
            sort: query.sort,
            page: query.page.max(1),
            query: query.q.clone(),
        }
    }

    /// State as URL query parameters. Only category selections are carried.
    #[must_use]
    pub fn to_query(&self) -> ListingQuery {
        ListingQuery {
            page: self.page,
            sort: self.sort,
            min_price: self.filters.min_price,
            max_price: self.filters.max_price,
            categories: self
                .filters
                .selected(&FilterGroup::Category)
                .map(str::to_owned)
                .collect(),
            q: self.query.clone(),
        }
    }

    #[must_use]
    pub const fn filters(&self) -> &FilterState {
        &self.filters
    }

    #[must_use]
    pub const fn sort(&self) -> SortKey {
        self.sort
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn select(&mut self, group: FilterGroup, value: impl Into<String>) {
        self.filters.select(group, value);
        self.page = 1;
    }

    pub fn deselect(&mut self, group: &FilterGroup, value: &str) {
        self.filters.deselect(group, value);
        self.page = 1;
    }

    pub fn toggle(&mut self, group: FilterGroup, value: &str) {
        self.filters.toggle(group, value);
        self.page = 1;
    }

    pub fn set_price_range(&mut self, min: Option<Decimal>, max: Option<Decimal>) {
        self.filters.min_price = min;
        self.filters.max_price = max;
        self.page = 1;
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
        self.page = 1;
    }

    /// Set the search text; blank text clears the search.
    pub fn set_query(&mut self, query: Option<&str>) {
        self.query = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_owned);
        self.page = 1;
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    /// Whether there are filters for [`reset_filters`](Self::reset_filters) to clear.
    #[must_use]
    pub fn can_reset_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    /// Clear every filter and the price range. Sort and search are kept.
    pub fn reset_filters(&mut self) {
        self.filters.clear();
        self.page = 1;
    }

    /// Run the pipeline over `products` and cut out the current page.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product], page_size: usize) -> Listing<'a> {
        let matched = super::apply(products, &self.filters, self.sort, self.query());
        Listing {
            page: paginate(matched, self.page, page_size),
            can_reset_filters: self.can_reset_filters(),
        }
    }
}

/// Result of applying a [`ListingState`].
#[derive(Debug, Clone)]
pub struct Listing<'a> {
    pub page: Page<&'a Product>,
    pub can_reset_filters: bool,
}

impl Listing<'_> {
    /// Nothing matched at all (as opposed to an out-of-range page).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.page.total_count == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn catalog(count: usize) -> Vec<Product> {
        (1..=count)
            .map(|n| {
                let category = if n % 2 == 0 { "even" } else { "odd" };
                serde_json::from_value(json!({
                    "id": format!("prod_{n:02}"),
                    "title": format!("Box {n:02}"),
                    "handle": format!("box-{n:02}"),
                    "categories": [{ "id": format!("pcat_{category}"), "name": category, "handle": category }],
                    "variants": [{ "id": format!("variant_{n:02}"), "title": "Default",
                                   "prices": [{ "amount": n * 1000, "currency_code": "usd" }] }]
                }))
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_every_change_resets_page() {
        let mut state = ListingState::new();
        let changes: [fn(&mut ListingState); 5] = [
            |s| s.select(FilterGroup::Category, "odd"),
            |s| s.toggle(FilterGroup::Tag, "new"),
            |s| s.set_sort(SortKey::PriceDesc),
            |s| s.set_query(Some("box")),
            |s| s.set_price_range(Some(Decimal::ONE), None),
        ];
        for change in changes {
            state.set_page(3);
            change(&mut state);
            assert_eq!(state.page(), 1);
        }
    }

    #[test]
    fn test_paginates_filtered_results() {
        let products = catalog(25);
        let mut state = ListingState::new();

        let listing = state.apply(&products, 12);
        assert_eq!(listing.page.items.len(), 12);
        assert_eq!(listing.page.total_pages, 3);

        state.select(FilterGroup::Category, "odd");
        state.set_page(2);
        let listing = state.apply(&products, 12);
        assert_eq!(listing.page.total_count, 13);
        assert_eq!(listing.page.items.len(), 1);
        assert_eq!(listing.page.items[0].id.as_str(), "prod_25");
    }

    #[test]
    fn test_empty_result_then_reset_restores_everything() {
        let products = catalog(25);
        let mut state = ListingState::new();
        state.set_sort(SortKey::PriceDesc);
        state.select(FilterGroup::Category, "odd");
        state.set_price_range(Some(Decimal::new(1000, 0)), None);

        let listing = state.apply(&products, 12);
        assert!(listing.is_empty());
        assert!(listing.can_reset_filters);

        state.reset_filters();
        let listing = state.apply(&products, 12);
        assert_eq!(listing.page.total_count, 25);
        assert!(!listing.can_reset_filters);
        assert_eq!(state.sort(), SortKey::PriceDesc);
        assert_eq!(listing.page.items[0].id.as_str(), "prod_25");
    }

    #[test]
    fn test_query_roundtrip() {
        let query = ListingQuery::parse("category=odd&sort=newest&page=2&q=box&maxPrice=20");
        let state = ListingState::from_query(&query);
        assert!(state.filters().is_selected(&FilterGroup::Category, "odd"));
        assert_eq!(state.page(), 2);
        assert_eq!(state.query(), Some("box"));
        assert_eq!(state.to_query(), query);
    }
}
