//! Shopping cart container.
//!
//! Every mutation is expressed as a [`CartAction`] and applied by the pure
//! [`reduce`] function, then persisted by the shared sync engine.

use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::instrument;

use figurine_core::{LineItem, Product, ProductId};

use crate::identity::Identity;
use crate::store::CollectionName;
use crate::sync::{CollectionKind, Stores, SyncHandle, SyncedCollection, dedupe_by_id};

/// A change to the cart.
#[derive(Debug, Clone, PartialEq)]
pub enum CartAction {
    /// Add one unit, appending a new line if the product is not in the cart.
    AddItem(Product),
    /// Add `times` units in a single change.
    AddItemTimes { product: Product, times: u32 },
    RemoveItem(ProductId),
    /// Set a line's quantity; non-positive quantities remove the line.
    UpdateQuantity { id: ProductId, quantity: i64 },
    Clear,
}

/// Apply `action` to a cart collection.
pub fn reduce(items: &mut Vec<LineItem>, action: CartAction) {
    match action {
        CartAction::AddItem(product) => add_units(items, product, 1),
        CartAction::AddItemTimes { product, times } => add_units(items, product, times),
        CartAction::RemoveItem(id) => items.retain(|item| item.id() != id),
        CartAction::UpdateQuantity { id, quantity } => {
            let quantity = u32::try_from(quantity.max(0)).unwrap_or(u32::MAX);
            if let Some(item) = items.iter_mut().find(|item| item.id() == id) {
                item.quantity = quantity;
            }
            items.retain(|item| item.quantity > 0);
        }
        CartAction::Clear => items.clear(),
    }
}

fn add_units(items: &mut Vec<LineItem>, product: Product, units: u32) {
    if units == 0 {
        return;
    }
    if let Some(item) = items.iter_mut().find(|item| item.id() == product.id) {
        item.quantity = item.quantity.saturating_add(units);
    } else {
        items.push(LineItem {
            product,
            quantity: units,
        });
    }
}

/// Cart collection description for the sync engine.
#[derive(Debug)]
pub struct CartKind;

impl CollectionKind for CartKind {
    type Item = LineItem;
    const REMOTE: CollectionName = CollectionName::Carts;
    const LABEL: &'static str = "cart";

    fn item_id(item: &LineItem) -> ProductId {
        item.id()
    }

    fn normalize(items: Vec<LineItem>) -> Vec<LineItem> {
        let mut items = dedupe_by_id::<Self>(items);
        items.retain(|item| item.quantity > 0);
        items
    }
}

/// The shopper's cart.
///
/// Cheap to clone; clones share the same collection.
#[derive(Clone)]
pub struct Cart {
    items: SyncedCollection<CartKind>,
}

impl std::fmt::Debug for Cart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cart")
            .field("items", &self.items.items())
            .finish()
    }
}

impl Cart {
    /// An empty cart persisting to `local_key` while anonymous.
    #[must_use]
    pub fn new(stores: Stores, local_key: impl Into<String>) -> Self {
        Self {
            items: SyncedCollection::new(stores, local_key),
        }
    }

    /// Follow identity changes; see [`SyncedCollection::spawn_sync`].
    #[must_use]
    pub fn spawn_sync(&self, identities: watch::Receiver<Option<Identity>>) -> SyncHandle {
        self.items.spawn_sync(identities)
    }

    /// Switch to the current identity's store without waiting for the sync task.
    pub fn follow_current_identity(&self) {
        self.items.follow_current_identity();
    }

    /// Apply an action and persist the result.
    pub fn dispatch(&self, action: CartAction) {
        self.items.mutate(|items| reduce(items, action));
    }

    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add_item(&self, product: Product) {
        self.dispatch(CartAction::AddItem(product));
    }

    /// Add `times` units of `product` in one change. Zero is a no-op.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add_item_times(&self, product: Product, times: u32) {
        if times == 0 {
            return;
        }
        self.dispatch(CartAction::AddItemTimes { product, times });
    }

    #[instrument(skip(self))]
    pub fn remove_item(&self, id: ProductId) {
        self.dispatch(CartAction::RemoveItem(id));
    }

    /// Set the quantity of `id`. Zero or negative removes the line.
    #[instrument(skip(self))]
    pub fn update_quantity(&self, id: ProductId, quantity: i64) {
        self.dispatch(CartAction::UpdateQuantity { id, quantity });
    }

    #[instrument(skip(self))]
    pub fn clear_cart(&self) {
        self.dispatch(CartAction::Clear);
    }

    /// Sum of quantities.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.items
            .read(|items| items.iter().map(|item| u64::from(item.quantity)).sum())
    }

    /// Sum of `price * quantity`, unrounded.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.items
            .read(|items| items.iter().map(LineItem::line_total).sum())
    }

    #[must_use]
    pub fn is_in_cart(&self, id: ProductId) -> bool {
        self.items.contains(id)
    }

    /// Quantity of `id`, zero when absent.
    #[must_use]
    pub fn quantity_of(&self, id: ProductId) -> u32 {
        self.items.read(|items| {
            items
                .iter()
                .find(|item| item.id() == id)
                .map_or(0, |item| item.quantity)
        })
    }

    #[must_use]
    pub fn items(&self) -> Vec<LineItem> {
        self.items.items()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read(<[LineItem]>::is_empty)
    }

    /// Receiver bumped on every change, local or remote.
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.items.changes()
    }

    /// Wait for outstanding remote writes.
    pub async fn flush(&self) {
        self.items.flush().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::identity::IdentityProvider;
    use crate::store::{LocalStore, MemoryDocumentStore, MemoryLocalStore};

    fn product(id: i64, price: i64) -> Product {
        Product::new(ProductId::new(id), format!("Figure {id}"), Decimal::from(price))
    }

    fn cart() -> (Cart, MemoryLocalStore) {
        let local = MemoryLocalStore::new();
        let cart = Cart::new(Stores::new(MemoryDocumentStore::new(), local.clone()), "figurine-cart");
        (cart, local)
    }

    #[test]
    fn test_reduce_add_and_increment() {
        let mut items = Vec::new();
        reduce(&mut items, CartAction::AddItem(product(1, 100)));
        reduce(&mut items, CartAction::AddItem(product(2, 50)));
        reduce(&mut items, CartAction::AddItem(product(1, 100)));

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[1].quantity, 1);
    }

    #[test]
    fn test_reduce_update_quantity_clamps_and_removes() {
        let mut items = vec![LineItem::new(product(1, 100)), LineItem::new(product(2, 100))];

        reduce(&mut items, CartAction::UpdateQuantity { id: ProductId::new(1), quantity: 5 });
        assert_eq!(items[0].quantity, 5);

        reduce(&mut items, CartAction::UpdateQuantity { id: ProductId::new(1), quantity: -3 });
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id(), ProductId::new(2));

        reduce(&mut items, CartAction::UpdateQuantity { id: ProductId::new(9), quantity: 4 });
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_reduce_add_times_zero_is_noop() {
        let mut items = Vec::new();
        reduce(&mut items, CartAction::AddItemTimes { product: product(1, 10), times: 0 });
        assert!(items.is_empty());
    }

    #[test]
    fn test_scenario_add_add_zero() {
        let (cart, _) = cart();
        let p = product(1, 100);

        cart.add_item(p.clone());
        assert_eq!(cart.total_items(), 1);
        assert_eq!(cart.total_price(), Decimal::from(100));

        cart.add_item(p);
        assert_eq!(cart.total_items(), 2);
        assert_eq!(cart.total_price(), Decimal::from(200));

        cart.update_quantity(ProductId::new(1), 0);
        assert!(cart.is_empty());
        assert_eq!(cart.total_price(), Decimal::ZERO);
    }

    #[test]
    fn test_n_adds_make_one_line() {
        let (cart, _) = cart();
        for _ in 0..7 {
            cart.add_item(product(3, 10));
        }
        cart.add_item_times(product(3, 10), 3);

        let items = cart.items();
        assert_eq!(items.len(), 1);
        assert_eq!(cart.quantity_of(ProductId::new(3)), 10);
        assert_eq!(cart.quantity_of(ProductId::new(4)), 0);
    }

    #[test]
    fn test_zero_quantity_equals_remove() {
        let (a, _) = cart();
        let (b, _) = cart();
        for c in [&a, &b] {
            c.add_item(product(1, 5));
            c.add_item(product(2, 7));
        }
        a.update_quantity(ProductId::new(1), 0);
        b.remove_item(ProductId::new(1));
        assert_eq!(a.items(), b.items());
    }

    #[test]
    fn test_total_price_is_exact() {
        let (cart, _) = cart();
        let mut p = product(1, 0);
        p.price = Decimal::new(1999, 2);
        cart.add_item_times(p, 3);
        assert_eq!(cart.total_price(), Decimal::new(5997, 2));
    }

    #[test]
    fn test_mutations_persist_to_local_store_without_runtime() {
        let (cart, local) = cart();
        cart.add_item(product(1, 100));
        cart.add_item(product(1, 100));

        let saved: Vec<LineItem> = serde_json::from_str(&local.get("figurine-cart").unwrap().unwrap()).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].quantity, 2);

        cart.clear_cart();
        assert_eq!(local.get("figurine-cart").unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_local_round_trip_into_new_cart() {
        let local = MemoryLocalStore::new();
        let remote = MemoryDocumentStore::new();
        let first = Cart::new(Stores::new(remote.clone(), local.clone()), "figurine-cart");
        first.add_item(product(1, 100));
        first.add_item(product(2, 250));
        first.update_quantity(ProductId::new(2), 4);

        let second = Cart::new(Stores::new(remote, local), "figurine-cart");
        let _sync = second.spawn_sync(IdentityProvider::anonymous().subscribe());
        assert_eq!(second.items(), first.items());
        assert_eq!(second.total_price(), Decimal::from(1100));
    }

    #[test]
    fn test_normalize_drops_duplicates_and_empty_lines() {
        let mut zero = LineItem::new(product(2, 1));
        zero.quantity = 0;
        let items = vec![LineItem::new(product(1, 1)), zero, LineItem::new(product(1, 1))];
        let normalized = CartKind::normalize(items);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].id(), ProductId::new(1));
    }
}
