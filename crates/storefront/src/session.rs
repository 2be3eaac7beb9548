//! A shopper's session: identity plus the cart and favorites that follow it.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{error, info, instrument};

use figurine_core::IdentityKey;
use figurine_core::checkout::{OrderSummary, Promo};

use crate::cart::Cart;
use crate::favorites::Favorites;
use crate::identity::{Identity, IdentityProvider};
use crate::profile::{ProfileError, ProfileUpdate, UserProfile};
use crate::store::{CollectionName, Document, lock};
use crate::sync::{Stores, SyncHandle};

/// Local store keys used while nobody is signed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalKeys {
    pub cart: String,
    pub favorites: String,
}

impl Default for LocalKeys {
    fn default() -> Self {
        Self {
            cart: "figurine-cart".to_string(),
            favorites: "figurine-favorites".to_string(),
        }
    }
}

/// Session state shared across the application.
///
/// This struct is cheaply cloneable via `Arc`. The containers keep syncing
/// until the last clone is dropped or [`Session::shutdown`] is called.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    identity: IdentityProvider,
    stores: Stores,
    cart: Cart,
    favorites: Favorites,
    sync: Mutex<Vec<SyncHandle>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.inner.identity.current())
            .field("cart", &self.inner.cart)
            .field("favorites", &self.inner.favorites)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Build the containers and start syncing them with `identity`.
    ///
    /// Both collections are hydrated for the current identity before this
    /// returns. Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(stores: Stores, keys: LocalKeys, identity: IdentityProvider) -> Self {
        let cart = Cart::new(stores.clone(), keys.cart);
        let favorites = Favorites::new(stores.clone(), keys.favorites);
        let sync = vec![
            cart.spawn_sync(identity.subscribe()),
            favorites.spawn_sync(identity.subscribe()),
        ];

        Self {
            inner: Arc::new(SessionInner {
                identity,
                stores,
                cart,
                favorites,
                sync: Mutex::new(sync),
            }),
        }
    }

    #[must_use]
    pub fn cart(&self) -> &Cart {
        &self.inner.cart
    }

    #[must_use]
    pub fn favorites(&self) -> &Favorites {
        &self.inner.favorites
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner.identity.current()
    }

    #[must_use]
    pub fn identity_provider(&self) -> &IdentityProvider {
        &self.inner.identity
    }

    /// Sign `identity` in. The cart and favorites switch to the account's
    /// documents before this returns.
    pub fn sign_in(&self, identity: Identity) {
        self.inner.identity.sign_in(identity);
        self.follow_identity();
    }

    /// Sign out. The cart and favorites switch back to the local store
    /// before this returns.
    pub fn sign_out(&self) {
        self.inner.identity.sign_out();
        self.follow_identity();
    }

    fn follow_identity(&self) {
        self.inner.cart.follow_current_identity();
        self.inner.favorites.follow_current_identity();
    }

    /// Register a new account: create its profile and empty cart and
    /// favorites documents, then sign in.
    ///
    /// Failing to create a document is logged; the sign-in still happens.
    #[instrument(skip(self, identity), fields(key = %identity.key))]
    pub async fn sign_up(&self, identity: Identity) {
        let remote = &self.inner.stores.remote;
        match UserProfile::new_account(&identity, Utc::now()).to_document() {
            Ok(document) => {
                if let Err(e) = remote.write(CollectionName::Users, &identity.key, document).await {
                    error!(error = %e, "Failed to create profile on sign-up");
                }
            }
            Err(e) => error!(error = %e, "Failed to encode profile on sign-up"),
        }
        for collection in [CollectionName::Carts, CollectionName::Favorites] {
            if let Err(e) = remote
                .write(collection, &identity.key, Document::empty())
                .await
            {
                error!(%collection, error = %e, "Failed to create document on sign-up");
            }
        }
        info!("Account created");
        self.sign_in(identity);
    }

    /// Profile stored for `key`, or `None` if it has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the document is malformed.
    #[instrument(skip(self))]
    pub async fn user_profile(
        &self,
        key: &IdentityKey,
    ) -> Result<Option<UserProfile>, ProfileError> {
        let document = self.inner.stores.remote.read(CollectionName::Users, key).await?;
        document.as_ref().map(UserProfile::from_document).transpose()
    }

    /// Profile of the signed-in user. `None` for a guest or an account
    /// without a profile document.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the document is malformed.
    pub async fn current_profile(&self) -> Result<Option<UserProfile>, ProfileError> {
        match self.identity() {
            Some(identity) => self.user_profile(&identity.key).await,
            None => Ok(None),
        }
    }

    /// Apply `update` to the signed-in user's profile and save it.
    ///
    /// A missing profile document is created. Name and email changes are
    /// also applied to the session identity.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::NotSignedIn` for a guest, or an error if the
    /// profile cannot be read or written.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<UserProfile, ProfileError> {
        let identity = self.identity().ok_or(ProfileError::NotSignedIn)?;
        let now = Utc::now();
        let mut profile = match self.user_profile(&identity.key).await? {
            Some(profile) => profile,
            None => UserProfile::new_account(&identity, now),
        };
        update.apply(&mut profile, now);

        self.inner
            .stores
            .remote
            .write(CollectionName::Users, &identity.key, profile.to_document()?)
            .await?;
        info!(key = %identity.key, "Profile updated");

        // Only if the same account is still signed in.
        if self.identity().is_some_and(|current| current.key == identity.key) {
            self.sign_in(profile.apply_to_identity(identity));
        }
        Ok(profile)
    }

    /// Add every favorite to the cart, in favorites order.
    ///
    /// Returns the number of products added.
    #[instrument(skip(self))]
    pub fn move_favorites_to_cart(&self) -> usize {
        let favorites = self.inner.favorites.items();
        let count = favorites.len();
        for product in favorites {
            self.inner.cart.add_item(product);
        }
        count
    }

    /// Totals for the current cart.
    #[must_use]
    pub fn order_summary(&self, promo: Option<&Promo>) -> OrderSummary {
        OrderSummary::compute(self.inner.cart.total_price(), promo)
    }

    /// Wait for outstanding remote writes from both containers.
    pub async fn flush(&self) {
        self.inner.cart.flush().await;
        self.inner.favorites.flush().await;
    }

    /// Flush pending writes and stop following identity changes.
    pub async fn shutdown(&self) {
        self.flush().await;
        let handles = std::mem::take(&mut *lock(&self.inner.sync));
        for handle in handles {
            handle.shutdown().await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use figurine_core::{Email, Product, ProductId};

    use super::*;
    use crate::profile::Address;
    use crate::store::{LocalStore, MemoryDocumentStore, MemoryLocalStore, RemoteDocumentStore};

    fn product(id: i64, price: i64) -> Product {
        Product::new(ProductId::new(id), format!("Scale Figure {id}"), Decimal::from(price))
    }

    fn session() -> (Session, MemoryDocumentStore) {
        let remote = MemoryDocumentStore::new();
        let stores = Stores::new(remote.clone(), MemoryLocalStore::new());
        (
            Session::start(stores, LocalKeys::default(), IdentityProvider::anonymous()),
            remote,
        )
    }

    fn identity(key: &str) -> Identity {
        Identity::new(IdentityKey::parse(key).unwrap())
    }

    #[tokio::test]
    async fn test_sign_up_creates_empty_documents() {
        let (session, remote) = session();
        let key = IdentityKey::parse("new-fan").unwrap();

        session.sign_up(Identity::new(key.clone())).await;

        assert_eq!(session.identity().unwrap().key, key);
        for collection in [CollectionName::Carts, CollectionName::Favorites] {
            let doc = remote.document(collection, &key).unwrap();
            assert!(doc.items.is_empty());
            assert!(doc.updated_at.is_some());
        }
    }

    #[tokio::test]
    async fn test_sign_up_signs_in_even_when_offline() {
        let (session, remote) = session();
        remote.set_offline(true);
        session
            .sign_up(Identity::new(IdentityKey::parse("offline-fan").unwrap()))
            .await;
        assert!(session.identity().is_some());
    }

    #[tokio::test]
    async fn test_move_favorites_to_cart() {
        let (session, _) = session();
        session.favorites().add_favorite(product(1, 1000));
        session.favorites().add_favorite(product(2, 2000));
        session.cart().add_item(product(2, 2000));

        assert_eq!(session.move_favorites_to_cart(), 2);

        let items = session.cart().items();
        assert_eq!(items.len(), 2);
        assert_eq!(session.cart().quantity_of(ProductId::new(2)), 2);
        assert_eq!(session.cart().quantity_of(ProductId::new(1)), 1);
        assert_eq!(session.favorites().len(), 2);
    }

    #[tokio::test]
    async fn test_order_summary_uses_cart_total() {
        let (session, _) = session();
        session.cart().add_item(product(1, 5000));

        let summary = session.order_summary(None);
        assert_eq!(summary.subtotal, Decimal::from(5000));
        assert_eq!(summary.shipping, Decimal::ZERO);

        let promo = Promo::lookup("save10").unwrap();
        let summary = session.order_summary(Some(&promo));
        assert_eq!(summary.discount, Decimal::from(500));
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let (session, _) = session();
        session.shutdown().await;
        session.shutdown().await;
        session.cart().add_item(product(1, 10));
        assert_eq!(session.cart().total_items(), 1);
    }

    // Each test below mutates with no await after the identity change, so on
    // the single-threaded test runtime the sync tasks have not run yet.

    #[tokio::test]
    async fn test_cart_add_right_after_sign_out_stays_local() {
        let remote = MemoryDocumentStore::new();
        let local = MemoryLocalStore::new();
        let session = Session::start(
            Stores::new(remote.clone(), local.clone()),
            LocalKeys::default(),
            IdentityProvider::with_identity(Some(identity("u1"))),
        );

        session.sign_out();
        session.cart().add_item(product(3, 300));
        session.flush().await;

        let saved = local.get("figurine-cart").unwrap().unwrap();
        assert!(saved.contains("\"id\":3"));
        assert!(remote
            .document(CollectionName::Carts, &IdentityKey::parse("u1").unwrap())
            .is_none());
    }

    #[tokio::test]
    async fn test_cart_add_right_after_sign_in_reaches_account() {
        let (session, remote) = session();
        let key = IdentityKey::parse("u2").unwrap();
        remote
            .write(CollectionName::Carts, &key, Document::empty())
            .await
            .unwrap();

        session.sign_in(identity("u2"));
        session.cart().add_item(product(7, 700));
        session.flush().await;

        let stored = remote.document(CollectionName::Carts, &key).unwrap();
        assert_eq!(stored.items.len(), 1);

        // The sync task catching up does not lose the item.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(session.cart().is_in_cart(ProductId::new(7)));
    }

    #[tokio::test]
    async fn test_sign_up_creates_profile() {
        let (session, remote) = session();
        let fan = identity("aki")
            .with_email(Email::parse("aki@figuro.ph").unwrap())
            .with_display_name("Aki");

        session.sign_up(fan.clone()).await;

        assert!(remote.document(CollectionName::Users, &fan.key).is_some());
        let profile = session.current_profile().await.unwrap().unwrap();
        assert_eq!(profile.display_name, "Aki");
        assert_eq!(profile.email, fan.email);
        assert!(profile.address.is_blank());
        assert!(profile.created_at.is_some());
    }

    #[tokio::test]
    async fn test_guest_has_no_profile() {
        let (session, _) = session();
        assert_eq!(session.current_profile().await.unwrap(), None);
        assert!(matches!(
            session.update_profile(ProfileUpdate::default()).await,
            Err(ProfileError::NotSignedIn)
        ));
    }

    #[tokio::test]
    async fn test_update_profile_saves_and_renames_identity() {
        let (session, _) = session();
        session.sign_up(identity("aki")).await;
        let created = session.current_profile().await.unwrap().unwrap();

        let update = ProfileUpdate {
            display_name: Some("Aki Hayakawa".to_string()),
            address: Some(Address {
                city: "Makati".to_string(),
                ..Address::default()
            }),
            ..ProfileUpdate::default()
        };
        let updated = session.update_profile(update).await.unwrap();

        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(session.current_profile().await.unwrap(), Some(updated));
        assert_eq!(
            session.identity().unwrap().display_name.as_deref(),
            Some("Aki Hayakawa")
        );
    }

    #[tokio::test]
    async fn test_update_profile_creates_missing_document() {
        let (session, remote) = session();
        session.sign_in(identity("legacy"));

        let update = ProfileUpdate {
            phone: Some("0917 123 4567".to_string()),
            ..ProfileUpdate::default()
        };
        session.update_profile(update).await.unwrap();

        let key = IdentityKey::parse("legacy").unwrap();
        let profile = session.user_profile(&key).await.unwrap().unwrap();
        assert_eq!(profile.phone, "0917 123 4567");
        assert!(remote.document(CollectionName::Users, &key).is_some());
    }

    #[tokio::test]
    async fn test_update_profile_offline_fails() {
        let (session, remote) = session();
        session.sign_in(identity("aki"));
        remote.set_offline(true);
        assert!(matches!(
            session.update_profile(ProfileUpdate::default()).await,
            Err(ProfileError::Store(_))
        ));
    }
}
