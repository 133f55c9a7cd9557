//! Catalog browsing: products, categories and collections.

use clap::{Args, Subcommand};
use mystery_box_core::{OptionSelection, Product};
use mystery_box_storefront::Storefront;
use mystery_box_storefront::api::ProductQuery;
use mystery_box_storefront::catalog::{
    FilterGroup, ListingQuery, ListingState, SortKey, facet_counts, paginate,
};
use mystery_box_storefront::error::{AppError, Result};
use rust_decimal::Decimal;

use crate::output;

#[derive(Subcommand)]
pub enum ProductsAction {
    /// List products with search, filters, sort and paging
    List(ListArgs),
    /// Show one product by handle
    Show {
        /// Product handle or id
        handle: String,

        /// Pick a variant by option value as TITLE=VALUE (repeatable)
        #[arg(long, value_parser = parse_option_filter)]
        option: Vec<(String, String)>,
    },
    /// Count products per filter value
    Facets {
        /// Filter group (`category`, `collection`, `tag`, `type` or `option:<title>`)
        group: FilterGroup,
    },
}

#[derive(Args)]
pub struct ListArgs {
    /// Search text
    #[arg(short, long)]
    q: Option<String>,

    /// Category handle or id (repeatable)
    #[arg(short, long)]
    category: Vec<String>,

    /// Collection handle or id (repeatable)
    #[arg(long)]
    collection: Vec<String>,

    /// Tag (repeatable)
    #[arg(short, long)]
    tag: Vec<String>,

    /// Product type (repeatable)
    #[arg(long = "type")]
    product_type: Vec<String>,

    /// Option value as TITLE=VALUE, e.g. Size=M (repeatable)
    #[arg(long, value_parser = parse_option_filter)]
    option: Vec<(String, String)>,

    /// Minimum price in major units
    #[arg(long)]
    min_price: Option<Decimal>,

    /// Maximum price in major units
    #[arg(long)]
    max_price: Option<Decimal>,

    /// Sort order
    #[arg(short, long, default_value_t = SortKey::Featured)]
    sort: SortKey,

    /// Page number [default: 1, or the page in --from-query]
    #[arg(short, long)]
    page: Option<u32>,

    /// Start from a listing query string, e.g. "category=phones&sort=newest"
    #[arg(long)]
    from_query: Option<String>,
}

impl ListArgs {
    fn listing_state(&self) -> ListingState {
        let mut state = self
            .from_query
            .as_deref()
            .map(|query| ListingState::from_query(&ListingQuery::parse(query)))
            .unwrap_or_default();
        let page = self.page.unwrap_or_else(|| state.page());

        let selections = [
            (FilterGroup::Category, &self.category),
            (FilterGroup::Collection, &self.collection),
            (FilterGroup::Tag, &self.tag),
            (FilterGroup::Type, &self.product_type),
        ];
        for (group, values) in selections {
            for value in values {
                state.select(group.clone(), value.as_str());
            }
        }
        for (title, value) in &self.option {
            state.select(FilterGroup::Option(title.clone()), value.as_str());
        }

        if self.min_price.is_some() || self.max_price.is_some() {
            let min = self.min_price.or(state.filters().min_price);
            let max = self.max_price.or(state.filters().max_price);
            state.set_price_range(min, max);
        }
        if self.sort != SortKey::Featured {
            state.set_sort(self.sort);
        }
        if self.q.is_some() {
            state.set_query(self.q.as_deref());
        }

        state.set_page(page);
        state
    }
}

/// Resolve `TITLE=VALUE` pairs against the product's option ids.
fn option_selection(product: &Product, pairs: &[(String, String)]) -> Result<OptionSelection> {
    pairs
        .iter()
        .map(|(title, value)| {
            product
                .option_by_title(title)
                .map(|option| (option.id.clone(), value.clone()))
                .ok_or_else(|| {
                    AppError::InvalidInput(format!("{} has no option {title}", product.title))
                })
        })
        .collect()
}

fn parse_option_filter(raw: &str) -> std::result::Result<(String, String), String> {
    let (title, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected TITLE=VALUE, got `{raw}`"))?;
    let (title, value) = (title.trim(), value.trim());
    if title.is_empty() || value.is_empty() {
        return Err(format!("expected TITLE=VALUE, got `{raw}`"));
    }
    Ok((title.to_owned(), value.to_owned()))
}

#[derive(Subcommand)]
pub enum CategoriesAction {
    /// List all categories
    List,
    /// Show a category and its products
    Show {
        /// Category handle or id (`pcat_...`)
        category: String,
        /// Page number
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
}

#[derive(Subcommand)]
pub enum CollectionsAction {
    /// List all collections
    List,
    /// Show a collection and its products
    Show {
        /// Collection handle or id (`pcol_...`)
        collection: String,
        /// Page number
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
}

// =============================================================================
// Products
// =============================================================================

pub async fn products(storefront: &Storefront, action: ProductsAction) -> Result<()> {
    match action {
        ProductsAction::List(args) => list_products(storefront, &args).await,
        ProductsAction::Show { handle, option } => {
            let product = storefront.backend().find_product(&handle).await?;
            output::product_detail(&product);
            if !option.is_empty() {
                let selection = option_selection(&product, &option)?;
                output::variant_selection(&product, &selection);
            }
            Ok(())
        }
        ProductsAction::Facets { group } => {
            let products = all_products(storefront, &ProductQuery::default()).await?;
            for (value, count) in facet_counts(&products, &group) {
                println!("  {value:<32} {count:>5}");
            }
            Ok(())
        }
    }
}

async fn list_products(storefront: &Storefront, args: &ListArgs) -> Result<()> {
    let mut state = args.listing_state();
    let products = all_products(storefront, &ProductQuery::default()).await?;
    let page_size = storefront.config().page_size;

    let mut listing = state.apply(&products, page_size);
    if listing.page.is_out_of_range() {
        let last = listing.page.clamp_page();
        tracing::info!(requested = state.page(), shown = last, "Page out of range");
        println!("Page {} does not exist, showing page {last}.", state.page());
        state.set_page(last);
        listing = state.apply(&products, page_size);
    }

    if listing.is_empty() {
        println!("No products match these filters.");
        if listing.can_reset_filters {
            let mut reset = state.clone();
            reset.reset_filters();
            let available = reset.apply(&products, page_size).page.total_count;
            println!("Clear the filters to see all {available} products.");
        }
        return Ok(());
    }

    println!("Sorted by {}", state.sort().label());
    println!();
    for product in &listing.page.items {
        output::product_row(product);
    }
    output::page_footer(&listing.page, "products");

    let query = state.to_query().to_query_string();
    if !query.is_empty() {
        println!("Query: {query}");
    }
    Ok(())
}

async fn all_products(storefront: &Storefront, query: &ProductQuery) -> Result<Vec<Product>> {
    Ok(storefront.backend().list_all_products(query).await?)
}

fn print_product_page(products: Vec<Product>, page: u32, page_size: usize) {
    let page = paginate(products, page, page_size);
    if page.total_count == 0 {
        println!("No products yet.");
        return;
    }
    for product in &page.items {
        output::product_row(product);
    }
    output::page_footer(&page, "products");
}

// =============================================================================
// Categories & Collections
// =============================================================================

pub async fn categories(storefront: &Storefront, action: CategoriesAction) -> Result<()> {
    match action {
        CategoriesAction::List => {
            let list = storefront.backend().list_categories().await?;
            for category in &list.categories {
                println!("  {:<32} {}", category.name, category.handle);
            }
            println!();
            println!("{} categories", list.categories.len());
            Ok(())
        }
        CategoriesAction::Show { category, page } => {
            let found = storefront.backend().find_category(&category).await?;

            println!("{}", found.name);
            if let Some(description) = found.description.as_deref().filter(|d| !d.is_empty()) {
                println!("{description}");
            }
            println!();

            let query = ProductQuery {
                category_ids: vec![found.id],
                ..ProductQuery::default()
            };
            let products = all_products(storefront, &query).await?;
            print_product_page(products, page, storefront.config().page_size);
            Ok(())
        }
    }
}

pub async fn collections(storefront: &Storefront, action: CollectionsAction) -> Result<()> {
    match action {
        CollectionsAction::List => {
            let list = storefront.backend().list_collections().await?;
            for collection in &list.collections {
                println!("  {:<32} {}", collection.title, collection.handle);
            }
            println!();
            println!("{} collections", list.collections.len());
            Ok(())
        }
        CollectionsAction::Show { collection, page } => {
            let found = storefront.backend().find_collection(&collection).await?;

            println!("{}", found.title);
            println!();

            let query = ProductQuery {
                collection_ids: vec![found.id],
                ..ProductQuery::default()
            };
            let products = all_products(storefront, &query).await?;
            print_product_page(products, page, storefront.config().page_size);
            Ok(())
        }
    }
}
