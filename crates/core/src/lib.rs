//! Figurine Core - Shared types library.
//!
//! This crate provides common types used across all storefront components:
//! - `storefront` - Session engine (cart, favorites, confirmation dialogs)
//! - `cli` - Command-line front end driving a single session
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! persistence, no async runtime. This keeps it lightweight and allows it to
//! be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, emails, product snapshots, price formatting
//! - [`catalog`] - Product filtering and sorting
//! - [`checkout`] - Order summary (shipping, promo codes, VAT)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod checkout;
pub mod types;

pub use types::*;
