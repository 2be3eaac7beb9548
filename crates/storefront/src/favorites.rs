//! Favorites (wishlist) container.

use tokio::sync::watch;
use tracing::instrument;

use figurine_core::{Product, ProductId};

use crate::identity::Identity;
use crate::store::CollectionName;
use crate::sync::{CollectionKind, Stores, SyncHandle, SyncedCollection};

/// A change to the favorites list.
#[derive(Debug, Clone, PartialEq)]
pub enum FavoritesAction {
    /// Append unless already present.
    Add(Product),
    Remove(ProductId),
    Clear,
}

/// Apply `action` to a favorites collection.
pub fn reduce(items: &mut Vec<Product>, action: FavoritesAction) {
    match action {
        FavoritesAction::Add(product) => {
            if !items.iter().any(|item| item.id == product.id) {
                items.push(product);
            }
        }
        FavoritesAction::Remove(id) => items.retain(|item| item.id != id),
        FavoritesAction::Clear => items.clear(),
    }
}

#[derive(Debug)]
pub struct FavoritesKind;

impl CollectionKind for FavoritesKind {
    type Item = Product;
    const REMOTE: CollectionName = CollectionName::Favorites;
    const LABEL: &'static str = "favorites";

    fn item_id(item: &Product) -> ProductId {
        item.id
    }
}

/// Products the shopper has marked as favorites.
///
/// Cheap to clone; clones share the same collection.
#[derive(Clone)]
pub struct Favorites {
    items: SyncedCollection<FavoritesKind>,
}

impl std::fmt::Debug for Favorites {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Favorites")
            .field("items", &self.items.items())
            .finish()
    }
}

impl Favorites {
    #[must_use]
    pub fn new(stores: Stores, local_key: impl Into<String>) -> Self {
        Self {
            items: SyncedCollection::new(stores, local_key),
        }
    }

    #[must_use]
    pub fn spawn_sync(&self, identities: watch::Receiver<Option<Identity>>) -> SyncHandle {
        self.items.spawn_sync(identities)
    }

    /// Switch to the current identity's store without waiting for the sync task.
    pub fn follow_current_identity(&self) {
        self.items.follow_current_identity();
    }

    pub fn dispatch(&self, action: FavoritesAction) {
        self.items.mutate(|items| reduce(items, action));
    }

    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add_favorite(&self, product: Product) {
        self.dispatch(FavoritesAction::Add(product));
    }

    #[instrument(skip(self))]
    pub fn remove_favorite(&self, id: ProductId) {
        self.dispatch(FavoritesAction::Remove(id));
    }

    /// Remove `product` if it is a favorite, otherwise add it.
    ///
    /// Returns whether the product is a favorite afterwards.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn toggle_favorite(&self, product: Product) -> bool {
        self.items.mutate(|items| {
            if items.iter().any(|item| item.id == product.id) {
                reduce(items, FavoritesAction::Remove(product.id));
                false
            } else {
                reduce(items, FavoritesAction::Add(product));
                true
            }
        })
    }

    #[must_use]
    pub fn is_favorite(&self, id: ProductId) -> bool {
        self.items.contains(id)
    }

    #[instrument(skip(self))]
    pub fn clear_favorites(&self) {
        self.dispatch(FavoritesAction::Clear);
    }

    #[must_use]
    pub fn items(&self) -> Vec<Product> {
        self.items.items()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read(<[Product]>::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.items.changes()
    }

    pub async fn flush(&self) {
        self.items.flush().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::store::{LocalStore, MemoryDocumentStore, MemoryLocalStore};

    fn product(id: i64) -> Product {
        Product::new(ProductId::new(id), format!("Nendoroid {id}"), Decimal::from(2500))
    }

    fn favorites() -> (Favorites, MemoryLocalStore) {
        let local = MemoryLocalStore::new();
        let favorites = Favorites::new(
            Stores::new(MemoryDocumentStore::new(), local.clone()),
            "figurine-favorites",
        );
        (favorites, local)
    }

    #[test]
    fn test_add_is_idempotent() {
        let (favorites, _) = favorites();
        favorites.add_favorite(product(1));
        favorites.add_favorite(product(1));
        assert_eq!(favorites.len(), 1);
        assert!(favorites.is_favorite(ProductId::new(1)));
    }

    #[test]
    fn test_toggle_twice_restores_collection() {
        let (favorites, _) = favorites();
        favorites.add_favorite(product(1));
        favorites.add_favorite(product(2));
        let before = favorites.items();

        assert!(favorites.toggle_favorite(product(3)));
        assert!(!favorites.toggle_favorite(product(3)));
        assert_eq!(favorites.items(), before);

        assert!(!favorites.toggle_favorite(product(1)));
        assert!(favorites.toggle_favorite(product(1)));
        assert_eq!(favorites.len(), 2);
    }

    #[test]
    fn test_remove_and_clear() {
        let (favorites, local) = favorites();
        favorites.add_favorite(product(1));
        favorites.add_favorite(product(2));

        favorites.remove_favorite(ProductId::new(1));
        favorites.remove_favorite(ProductId::new(42));
        assert_eq!(favorites.items(), vec![product(2)]);

        favorites.clear_favorites();
        assert!(favorites.is_empty());
        assert_eq!(local.get("figurine-favorites").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let (favorites, local) = favorites();
        for id in [5, 3, 9] {
            favorites.add_favorite(product(id));
        }
        let saved: Vec<Product> = serde_json::from_str(&local.get("figurine-favorites").unwrap().unwrap()).unwrap();
        let ids: Vec<i64> = saved.iter().map(|p| p.id.as_i64()).collect();
        assert_eq!(ids, vec![5, 3, 9]);
    }
}
