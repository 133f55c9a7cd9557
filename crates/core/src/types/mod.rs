//! Core types for Mystery Box.
//!
//! This module provides type-safe wrappers for the storefront's domain concepts.

pub mod cart;
pub mod customer;
pub mod email;
pub mod id;
pub mod money;
pub mod product;
pub mod wishlist;

pub use cart::{Cart, CartItem, CartVariant, Quantity, QuantityError, Region};
pub use customer::{
    Address, AddressInput, Customer, CustomerInput, DEFAULT_ADDRESS_KEY, FieldError,
};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{CurrencyCode, Money, format_amount, format_price_range, major_to_minor};
pub use product::{
    Category, Collection, OptionSelection, OptionValue, Product, ProductOption, ProductTag,
    ProductType, ProductVariant, VariantOptionValue, VariantPrice,
};
pub use wishlist::WishlistItem;
