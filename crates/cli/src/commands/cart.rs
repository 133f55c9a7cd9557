//! Cart commands.

use clap::Subcommand;
use mystery_box_core::{LineItemId, VariantId};
use mystery_box_storefront::Storefront;
use mystery_box_storefront::error::Result;

use crate::output;

#[derive(Subcommand)]
pub enum CartAction {
    /// Show the current cart
    Show,
    /// Add a variant to the cart
    Add {
        /// Variant id
        variant_id: String,
        /// Quantity to add (1-10)
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Change a line item's quantity
    Update {
        /// Line item id
        item_id: String,
        /// New quantity (1-10)
        quantity: u32,
    },
    /// Remove a line item
    Remove {
        /// Line item id
        item_id: String,
    },
    /// Remove every line item
    Clear,
    /// Reload the cart from the backend, starting a new one if it is gone
    Refresh,
}

pub async fn run(storefront: &Storefront, action: CartAction) -> Result<()> {
    let cart = storefront.cart();

    let updated = match action {
        CartAction::Show => match cart.initialize().await? {
            Some(current) => current,
            None => {
                println!("Your cart is empty.");
                return Ok(());
            }
        },
        CartAction::Add {
            variant_id,
            quantity,
        } => {
            let updated = cart.add_item(&VariantId::new(variant_id), quantity).await?;
            println!("Added to cart.");
            updated
        }
        CartAction::Update { item_id, quantity } => {
            cart.update_item(&LineItemId::new(item_id), quantity).await?
        }
        CartAction::Remove { item_id } => cart.remove_item(&LineItemId::new(item_id)).await?,
        CartAction::Clear => cart.clear_cart().await?,
        CartAction::Refresh => cart.refresh_cart().await?,
    };

    output::cart(&updated);
    Ok(())
}
