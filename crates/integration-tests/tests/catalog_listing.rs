//! Catalog reads over HTTP feeding the client-side listing pipeline.

#![allow(clippy::unwrap_used)]

use mystery_box_integration_tests::{TestShop, catalog};
use mystery_box_storefront::api::ProductQuery;
use mystery_box_storefront::catalog::{
    DEFAULT_PAGE_SIZE, FilterGroup, ListingQuery, ListingState, SortKey, facet_counts,
};
use mystery_box_storefront::{AppError, ErrorKind};
use rust_decimal::Decimal;

#[tokio::test]
async fn test_fetch_all_walks_every_page() {
    let shop = TestShop::start(catalog(130)).await;
    let dir = tempfile::tempdir().unwrap();
    let storefront = shop.storefront(dir.path());

    let products = storefront
        .backend()
        .list_all_products(&ProductQuery::default())
        .await
        .unwrap();
    assert_eq!(products.len(), 130);

    let offsets: Vec<String> = shop
        .requests()
        .await
        .iter()
        .filter_map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "offset")
                .map(|(_, v)| v.into_owned())
        })
        .collect();
    assert_eq!(offsets, vec!["0", "100"]);
}

#[tokio::test]
async fn test_listing_filters_sorts_and_pages() {
    let shop = TestShop::start(catalog(25)).await;
    let dir = tempfile::tempdir().unwrap();
    let storefront = shop.storefront(dir.path());
    let products = storefront
        .backend()
        .list_all_products(&ProductQuery::default())
        .await
        .unwrap();

    let mut state = ListingState::new();
    let listing = state.apply(&products, DEFAULT_PAGE_SIZE);
    assert_eq!(listing.page.total_count, 25);
    assert_eq!(listing.page.total_pages, 3);
    assert_eq!(listing.page.items.len(), 12);

    state.select(FilterGroup::Category, "phones");
    state.set_sort(SortKey::PriceDesc);
    let listing = state.apply(&products, DEFAULT_PAGE_SIZE);
    assert_eq!(listing.page.total_count, 12);
    assert_eq!(listing.page.items[0].title, "Mystery Box 024");
    assert!(!listing.page.has_next());

    state.set_price_range(Some(Decimal::new(100, 0)), Some(Decimal::new(200, 0)));
    let titles: Vec<&str> = state
        .apply(&products, DEFAULT_PAGE_SIZE)
        .page
        .items
        .iter()
        .map(|p| p.title.as_str())
        .collect();
    assert_eq!(
        titles,
        vec![
            "Mystery Box 020",
            "Mystery Box 018",
            "Mystery Box 016",
            "Mystery Box 014",
            "Mystery Box 012",
            "Mystery Box 010",
        ]
    );
}

#[tokio::test]
async fn test_empty_listing_resets_to_full_catalog() {
    let shop = TestShop::start(catalog(25)).await;
    let dir = tempfile::tempdir().unwrap();
    let storefront = shop.storefront(dir.path());
    let products = storefront
        .backend()
        .list_all_products(&ProductQuery::default())
        .await
        .unwrap();

    let mut state = ListingState::from_query(&ListingQuery::parse(
        "category=phones&tag=ignored&minPrice=1000&q=mystery",
    ));
    state.select(FilterGroup::Tag, "Samsung");
    let listing = state.apply(&products, DEFAULT_PAGE_SIZE);
    assert!(listing.is_empty());
    assert!(listing.can_reset_filters);

    state.reset_filters();
    assert_eq!(state.query(), Some("mystery"));
    assert_eq!(state.apply(&products, DEFAULT_PAGE_SIZE).page.total_count, 25);
}

#[tokio::test]
async fn test_shared_query_string_restores_listing() {
    let shop = TestShop::start(catalog(25)).await;
    let dir = tempfile::tempdir().unwrap();
    let storefront = shop.storefront(dir.path());
    let products = storefront
        .backend()
        .list_all_products(&ProductQuery::default())
        .await
        .unwrap();

    let mut original = ListingState::new();
    original.select(FilterGroup::Category, "accessories");
    original.set_sort(SortKey::NameDesc);
    original.set_page(2);
    let shared = original.to_query().to_query_string();

    let restored = ListingState::from_query(&ListingQuery::parse(&format!("?{shared}")));
    let first = original.apply(&products, 5);
    let second = restored.apply(&products, 5);
    assert_eq!(first.page.page, 2);
    assert_eq!(
        first.page.items.iter().map(|p| &p.id).collect::<Vec<_>>(),
        second.page.items.iter().map(|p| &p.id).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_facets_count_fetched_products() {
    let shop = TestShop::start(catalog(9)).await;
    let dir = tempfile::tempdir().unwrap();
    let storefront = shop.storefront(dir.path());
    let products = storefront
        .backend()
        .list_all_products(&ProductQuery::default())
        .await
        .unwrap();

    assert_eq!(
        facet_counts(&products, &FilterGroup::Tag),
        vec![("Apple".to_owned(), 4), ("Samsung".to_owned(), 5)]
    );
}

#[tokio::test]
async fn test_unknown_handle_reads_as_not_found() {
    let shop = TestShop::start(catalog(3)).await;
    let dir = tempfile::tempdir().unwrap();
    let storefront = shop.storefront(dir.path());

    let found = storefront
        .backend()
        .get_product_by_handle("box-002")
        .await
        .unwrap();
    assert_eq!(found.title, "Mystery Box 002");

    let err = AppError::from(
        storefront
            .backend()
            .get_product_by_handle("no-such-box")
            .await
            .unwrap_err(),
    );
    assert_eq!(err.kind(), ErrorKind::Business);
    assert_eq!(err.user_message(), "Product not found: no-such-box");
}

#[tokio::test]
async fn test_categories_come_from_backend() {
    let shop = TestShop::start(catalog(4)).await;
    let dir = tempfile::tempdir().unwrap();
    let storefront = shop.storefront(dir.path());

    let list = storefront.backend().list_categories().await.unwrap();
    let handles: Vec<&str> = list.categories.iter().map(|c| c.handle.as_str()).collect();
    assert_eq!(handles, vec!["accessories", "phones"]);

    let phones = storefront
        .backend()
        .list_all_products(&ProductQuery {
            category_ids: vec![list.categories[1].id.clone()],
            ..ProductQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(phones.len(), 2);
}

#[tokio::test]
async fn test_category_lookup_by_id_or_handle() {
    let shop = TestShop::start(catalog(4)).await;
    let dir = tempfile::tempdir().unwrap();
    let storefront = shop.storefront(dir.path());
    let backend = storefront.backend();

    let by_id = backend.find_category("pcat_phones").await.unwrap();
    let by_handle = backend.find_category("phones").await.unwrap();
    assert_eq!(by_id, by_handle);

    let paths: Vec<String> = shop
        .requests()
        .await
        .iter()
        .map(|r| r.url.path().to_owned())
        .collect();
    assert_eq!(
        paths,
        vec!["/store/product-categories/pcat_phones", "/store/product-categories"]
    );

    let product = backend.find_product("box-003").await.unwrap();
    assert_eq!(product.id.as_str(), "box_003");

    let err = AppError::from(backend.find_category("pcat_garden").await.unwrap_err());
    assert_eq!(err.kind(), ErrorKind::Business);
}
