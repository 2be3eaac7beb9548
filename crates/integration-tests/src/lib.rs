//! Integration tests for the figurine storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p figurine-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_sync` - Cart hydration, persistence and identity switching
//! - `favorites_sync` - Favorites across devices and sign-out
//! - `session_flow` - Sign-up, dialog-gated actions and file-backed stores
//!
//! This library holds the fixtures those tests share.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::time::Duration;

use figurine_core::{IdentityKey, Product, ProductId};
use figurine_storefront::store::{MemoryDocumentStore, MemoryLocalStore};
use figurine_storefront::{Identity, IdentityProvider, LocalKeys, Session, Stores};
use rust_decimal::Decimal;

/// How long [`eventually`] waits before failing.
pub const SYNC_TIMEOUT: Duration = Duration::from_secs(2);

/// A product snapshot with a whole-peso price.
#[must_use]
pub fn product(id: i64, price: i64) -> Product {
    let mut product = Product::new(ProductId::new(id), format!("Figure #{id}"), Decimal::from(price));
    product.brand = "Good Smile Company".to_string();
    product.scale = "1/7".to_string();
    product
}

/// An identity for `key`.
///
/// # Panics
///
/// Panics if `key` is not a valid identity key.
#[must_use]
#[allow(clippy::expect_used)]
pub fn identity(key: &str) -> Identity {
    Identity::new(IdentityKey::parse(key).expect("valid identity key"))
}

/// One simulated device: its own local store and identity, sharing the
/// remote store with every other device built from the same `remote`.
pub struct Device {
    pub local: MemoryLocalStore,
    pub identity: IdentityProvider,
    pub session: Session,
}

impl Device {
    /// Start a session on a fresh device. Must run inside a Tokio runtime.
    #[must_use]
    pub fn new(remote: &MemoryDocumentStore) -> Self {
        Self::with_local(remote, MemoryLocalStore::new())
    }

    /// Start a session on a device whose local store already has data.
    #[must_use]
    pub fn with_local(remote: &MemoryDocumentStore, local: MemoryLocalStore) -> Self {
        let identity = IdentityProvider::anonymous();
        let session = Session::start(
            Stores::new(remote.clone(), local.clone()),
            LocalKeys::default(),
            identity.clone(),
        );
        Self {
            local,
            identity,
            session,
        }
    }
}

/// Poll `check` until it holds or [`SYNC_TIMEOUT`] elapses.
///
/// # Panics
///
/// Panics with `what` if the condition never holds.
pub async fn eventually(what: &str, check: impl Fn() -> bool) {
    let waited = tokio::time::timeout(SYNC_TIMEOUT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for: {what}");
}
