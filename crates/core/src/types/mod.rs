//! Core types for the figurine storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod product;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{calculate_discount, calculate_savings, format_price, format_price_range};
pub use product::{LineItem, Product};
