//! Plain-text rendering of storefront data.

use mystery_box_core::{
    Cart, Customer, OptionSelection, Product, WishlistItem, format_price_range,
};
use mystery_box_storefront::catalog::Page;

/// Price label for a product card: a single price or a min-max range.
pub fn price_label(product: &Product) -> String {
    product
        .sort_price()
        .and_then(|price| product.price_range(&price.currency_code))
        .map_or_else(
            || "Unavailable".to_owned(),
            |(min, max)| format_price_range(&min, &max),
        )
}

pub fn product_row(product: &Product) {
    println!(
        "  {:<40} {:>20}  {}",
        product.title,
        price_label(product),
        product.handle
    );
}

pub fn product_detail(product: &Product) {
    println!("{}", product.title);
    if let Some(subtitle) = &product.subtitle {
        println!("{subtitle}");
    }
    println!("{}", price_label(product));
    if let Some(description) = product.description.as_deref().filter(|d| !d.is_empty()) {
        println!();
        println!("{description}");
    }

    for option in &product.options {
        println!();
        println!("{}: {}", option.title, product.option_values(&option.title).join(", "));
    }

    println!();
    println!("Variants:");
    for variant in &product.variants {
        let price = variant
            .prices
            .first()
            .map_or_else(|| "-".to_owned(), |p| p.money().display());
        let stock = if variant.is_purchasable() {
            ""
        } else {
            "  (sold out)"
        };
        println!("  {:<24} {:>12}  {}{stock}", variant.title, price, variant.id);
    }
}

/// Outcome of choosing option values on a product page.
pub fn variant_selection(product: &Product, selection: &OptionSelection) {
    println!();
    match product.select_variant(selection) {
        Some(variant) if variant.is_purchasable() => {
            println!("Selected: {} ({})", variant.title, variant.id);
        }
        Some(variant) => println!("Selected: {} (sold out)", variant.title),
        None if product.is_available(selection) => {
            println!("Choose a value for every option to pick a variant.");
        }
        None => println!("This combination is unavailable."),
    }
}

pub fn page_footer<T>(page: &Page<T>, noun: &str) {
    println!();
    println!(
        "Page {} of {} ({} {noun})",
        page.page,
        page.total_pages.max(1),
        page.total_count
    );
}

pub fn cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }

    for item in &cart.items {
        println!(
            "  {:>3} x {:<32} {:>12} {:>12}  {}",
            item.quantity,
            format!("{} ({})", item.title, item.variant.title),
            cart.money(item.unit_price).display(),
            cart.money(item.total).display(),
            item.id
        );
    }

    println!();
    println!("  Items:    {}", cart.item_count());
    println!("  Subtotal: {}", cart.money(cart.subtotal));
    if cart.discount_total != 0 {
        println!("  Discount: -{}", cart.money(cart.discount_total));
    }
    println!("  Shipping: {}", cart.money(cart.shipping_total));
    println!("  Tax:      {}", cart.money(cart.tax_total));
    println!("  Total:    {}", cart.money(cart.total));
}

pub fn wishlist(items: &[WishlistItem]) {
    if items.is_empty() {
        println!("Your wishlist is empty.");
        return;
    }
    for item in items {
        println!(
            "  {:<40} {:>12}  {}  (saved {})",
            format!("{} ({})", item.title, item.variant_title),
            item.money().display(),
            item.variant_id,
            item.added_at.format("%Y-%m-%d")
        );
    }
}

pub fn customer(customer: &Customer) {
    println!("{} <{}>", customer.display_name(), customer.email);
    if let Some(phone) = &customer.phone {
        println!("Phone: {phone}");
    }

    println!();
    if customer.shipping_addresses.is_empty() {
        println!("No saved addresses.");
        return;
    }
    println!("Addresses:");
    for address in &customer.shipping_addresses {
        let marker = if address.is_default() { " (default)" } else { "" };
        println!("  {}  {}{marker}", address.id, address.summary());
    }
}
