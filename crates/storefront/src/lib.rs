//! Figurine Storefront session engine.
//!
//! This crate keeps a shopper's cart and favorites in memory and in sync with
//! the store that owns them: a per-device local store while anonymous, a
//! per-user remote document store once signed in.
//!
//! # Modules
//!
//! - [`store`] - Local and remote store traits with memory and file backends
//! - [`sync`] - Generic synchronization engine behind both containers
//! - [`cart`] / [`favorites`] - The two state containers
//! - [`dialog`] - Confirmation gate for destructive actions
//! - [`session`] - Identity plus containers, wired together
//! - [`profile`] - Account profiles in the `users` collection
//! - [`config`] - Environment configuration

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod dialog;
pub mod error;
pub mod favorites;
pub mod identity;
pub mod profile;
pub mod session;
pub mod store;
pub mod sync;

pub use cart::{Cart, CartAction};
pub use config::{ConfigError, StorefrontConfig};
pub use dialog::{AddOutcome, ConfirmationDialog, PendingAction, Prompt};
pub use error::{Result, StoreError};
pub use favorites::{Favorites, FavoritesAction};
pub use identity::{Identity, IdentityProvider};
pub use profile::{Address, ProfileError, ProfileUpdate, UserProfile};
pub use session::{LocalKeys, Session};
pub use sync::{Stores, SyncHandle};
