//! Wishlist commands. The wishlist lives on this machine only.

use chrono::Utc;
use clap::Subcommand;
use mystery_box_core::{CurrencyCode, VariantId, WishlistItem};
use mystery_box_storefront::Storefront;
use mystery_box_storefront::error::{AppError, Result};

use crate::output;

const FALLBACK_CURRENCY: &str = "usd";

#[derive(Subcommand)]
pub enum WishlistAction {
    /// List saved items
    List,
    /// Save a product variant
    Add {
        /// Product handle or id
        handle: String,
        /// Variant id (defaults to the product's first variant)
        #[arg(long)]
        variant: Option<String>,
    },
    /// Remove a saved variant
    Remove {
        /// Variant id
        variant_id: String,
    },
    /// Move a saved variant into the cart
    Move {
        /// Variant id
        variant_id: String,
    },
    /// Remove every saved item
    Clear,
}

pub async fn run(storefront: &Storefront, action: WishlistAction) -> Result<()> {
    let wishlist = storefront.wishlist();

    match action {
        WishlistAction::List => output::wishlist(&wishlist.items()),
        WishlistAction::Add { handle, variant } => {
            let product = storefront.backend().find_product(&handle).await?;
            let variant = match variant {
                Some(id) => product.variant(&VariantId::new(id.as_str())).ok_or_else(|| {
                    AppError::InvalidInput(format!("{} has no variant {id}", product.title))
                })?,
                None => product.variants.first().ok_or_else(|| {
                    AppError::InvalidInput(format!("{} has no variants", product.title))
                })?,
            };
            let currency = product
                .sort_price()
                .map_or_else(|| CurrencyCode::new(FALLBACK_CURRENCY), |p| p.currency_code);

            let item = WishlistItem::from_variant(&product, variant, &currency, Utc::now());
            wishlist.add_item(item)?;
            println!("Saved {} ({}).", product.title, variant.title);
        }
        WishlistAction::Remove { variant_id } => {
            if wishlist.remove_item(&VariantId::new(variant_id))? {
                println!("Removed from wishlist.");
            } else {
                println!("That variant was not in your wishlist.");
            }
        }
        WishlistAction::Move { variant_id } => {
            let cart = wishlist
                .move_to_cart(&VariantId::new(variant_id), storefront.cart())
                .await?;
            println!("Moved to cart.");
            output::cart(&cart);
        }
        WishlistAction::Clear => {
            wishlist.clear_wishlist()?;
            println!("Wishlist cleared.");
        }
    }
    Ok(())
}
