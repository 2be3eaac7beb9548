//! Confirmation gate for destructive or ambiguous changes.
//!
//! The dialog holds at most one [`PendingAction`]. Opening a new action
//! replaces the previous one; confirming applies it to the containers,
//! cancelling drops it. Nothing here is persisted.

use tracing::{debug, info};

use figurine_core::{Product, ProductId};

use crate::cart::Cart;
use crate::favorites::Favorites;

/// An action waiting for the shopper's answer.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingAction {
    RemoveFromCart { id: ProductId, name: String },
    ClearCart { item_count: usize },
    /// Add `quantity` more units of a product that is already in the cart.
    AddDuplicate { product: Product, quantity: u32 },
    RemoveFavorite { id: ProductId, name: String },
    ClearFavorites { item_count: usize },
}

impl PendingAction {
    /// Text shown to the shopper for this action.
    #[must_use]
    pub fn prompt(&self) -> Prompt {
        match self {
            Self::RemoveFromCart { name, .. } => Prompt::new(
                "Remove Item",
                format!("Remove {name} from your cart?"),
                "Remove",
            ),
            Self::ClearCart { item_count } => Prompt::new(
                "Clear Cart",
                format!(
                    "Remove all {item_count} {} from your cart?",
                    plural(*item_count, "item")
                ),
                "Clear Cart",
            ),
            Self::AddDuplicate { quantity, .. } => Prompt::new(
                "Already in Cart",
                format!("This item is already in your cart. Would you like to add {quantity} more?"),
                format!("Add {quantity} More"),
            ),
            Self::RemoveFavorite { name, .. } => Prompt::new(
                "Remove Favorite",
                format!("Remove {name} from your favorites?"),
                "Remove",
            ),
            Self::ClearFavorites { item_count } => Prompt::new(
                "Clear Favorites",
                format!(
                    "Remove all {item_count} {} from your favorites?",
                    plural(*item_count, "item")
                ),
                "Clear All",
            ),
        }
    }

    fn apply(self, cart: &Cart, favorites: &Favorites) {
        match self {
            Self::RemoveFromCart { id, .. } => cart.remove_item(id),
            Self::ClearCart { .. } => cart.clear_cart(),
            Self::AddDuplicate { product, quantity } => cart.add_item_times(product, quantity),
            Self::RemoveFavorite { id, .. } => favorites.remove_favorite(id),
            Self::ClearFavorites { .. } => favorites.clear_favorites(),
        }
    }
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

/// Dialog copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub title: String,
    pub description: String,
    pub confirm_label: String,
    pub cancel_label: String,
}

impl Prompt {
    fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        confirm_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            confirm_label: confirm_label.into(),
            cancel_label: "Cancel".to_string(),
        }
    }
}

/// Result of [`ConfirmationDialog::request_add_to_cart`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Product was not in the cart and has been added.
    Added,
    /// Product is already in the cart; the dialog is waiting for an answer.
    NeedsConfirmation(Prompt),
}

/// Holds at most one pending action.
#[derive(Debug, Default)]
pub struct ConfirmationDialog {
    pending: Option<PendingAction>,
}

impl ConfirmationDialog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for confirmation of `action`, replacing anything pending.
    pub fn open(&mut self, action: PendingAction) -> Prompt {
        let prompt = action.prompt();
        if let Some(replaced) = self.pending.replace(action) {
            debug!(?replaced, "Pending action replaced");
        }
        prompt
    }

    #[must_use]
    pub const fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.pending.is_some()
    }

    /// Apply the pending action. Returns it, or `None` if nothing was pending.
    pub fn confirm(&mut self, cart: &Cart, favorites: &Favorites) -> Option<PendingAction> {
        let action = self.pending.take()?;
        info!(?action, "Action confirmed");
        action.clone().apply(cart, favorites);
        Some(action)
    }

    /// Drop the pending action without applying it.
    pub fn cancel(&mut self) -> Option<PendingAction> {
        let action = self.pending.take();
        if let Some(action) = &action {
            debug!(?action, "Action cancelled");
        }
        action
    }

    /// Add `quantity` units of `product`, asking first if it is already in
    /// the cart.
    pub fn request_add_to_cart(&mut self, cart: &Cart, product: Product, quantity: u32) -> AddOutcome {
        if cart.is_in_cart(product.id) {
            AddOutcome::NeedsConfirmation(self.open(PendingAction::AddDuplicate { product, quantity }))
        } else {
            cart.add_item_times(product, quantity);
            AddOutcome::Added
        }
    }

    /// Ask before removing `id` from the cart. `None` if it is not there.
    pub fn request_remove_from_cart(&mut self, cart: &Cart, id: ProductId) -> Option<Prompt> {
        let name = cart
            .items()
            .into_iter()
            .find(|item| item.id() == id)?
            .product
            .name;
        Some(self.open(PendingAction::RemoveFromCart { id, name }))
    }

    /// Ask before emptying the cart. `None` if it is already empty.
    pub fn request_clear_cart(&mut self, cart: &Cart) -> Option<Prompt> {
        let item_count = cart.items().len();
        (item_count > 0).then(|| self.open(PendingAction::ClearCart { item_count }))
    }

    /// Ask before removing a favorite. `None` if it is not a favorite.
    pub fn request_remove_favorite(&mut self, favorites: &Favorites, id: ProductId) -> Option<Prompt> {
        let name = favorites.items().into_iter().find(|item| item.id == id)?.name;
        Some(self.open(PendingAction::RemoveFavorite { id, name }))
    }

    /// Ask before clearing favorites. `None` if there are none.
    pub fn request_clear_favorites(&mut self, favorites: &Favorites) -> Option<Prompt> {
        let item_count = favorites.len();
        (item_count > 0).then(|| self.open(PendingAction::ClearFavorites { item_count }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::store::{MemoryDocumentStore, MemoryLocalStore};
    use crate::sync::Stores;

    fn product(id: i64) -> Product {
        Product::new(ProductId::new(id), format!("Figma {id}"), Decimal::from(3200))
    }

    fn containers() -> (Cart, Favorites) {
        let stores = Stores::new(MemoryDocumentStore::new(), MemoryLocalStore::new());
        (
            Cart::new(stores.clone(), "figurine-cart"),
            Favorites::new(stores, "figurine-favorites"),
        )
    }

    #[test]
    fn test_add_duplicate_prompt_copy() {
        let prompt = PendingAction::AddDuplicate {
            product: product(1),
            quantity: 2,
        }
        .prompt();
        assert_eq!(prompt.title, "Already in Cart");
        assert_eq!(
            prompt.description,
            "This item is already in your cart. Would you like to add 2 more?"
        );
        assert_eq!(prompt.confirm_label, "Add 2 More");
        assert_eq!(prompt.cancel_label, "Cancel");
    }

    #[test]
    fn test_request_add_to_cart_adds_new_and_gates_duplicate() {
        let (cart, favorites) = containers();
        let mut dialog = ConfirmationDialog::new();

        assert_eq!(dialog.request_add_to_cart(&cart, product(1), 2), AddOutcome::Added);
        assert_eq!(cart.quantity_of(ProductId::new(1)), 2);
        assert!(!dialog.is_open());

        let outcome = dialog.request_add_to_cart(&cart, product(1), 3);
        assert!(matches!(outcome, AddOutcome::NeedsConfirmation(_)));
        assert_eq!(cart.quantity_of(ProductId::new(1)), 2);

        let applied = dialog.confirm(&cart, &favorites).unwrap();
        assert!(matches!(applied, PendingAction::AddDuplicate { quantity: 3, .. }));
        assert_eq!(cart.quantity_of(ProductId::new(1)), 5);
        assert!(!dialog.is_open());
    }

    #[test]
    fn test_cancel_has_no_side_effects() {
        let (cart, favorites) = containers();
        cart.add_item(product(1));
        let mut dialog = ConfirmationDialog::new();

        dialog.request_clear_cart(&cart).unwrap();
        assert!(dialog.cancel().is_some());
        assert_eq!(cart.total_items(), 1);
        assert!(dialog.confirm(&cart, &favorites).is_none());
        assert!(dialog.cancel().is_none());
    }

    #[test]
    fn test_open_replaces_pending_action() {
        let (cart, favorites) = containers();
        cart.add_item(product(1));
        favorites.add_favorite(product(2));
        let mut dialog = ConfirmationDialog::new();

        dialog.request_clear_cart(&cart).unwrap();
        let prompt = dialog.request_remove_favorite(&favorites, ProductId::new(2)).unwrap();
        assert_eq!(prompt.description, "Remove Figma 2 from your favorites?");

        dialog.confirm(&cart, &favorites);
        assert_eq!(cart.total_items(), 1);
        assert!(favorites.is_empty());
    }

    #[test]
    fn test_requests_on_missing_targets_do_not_open() {
        let (cart, favorites) = containers();
        let mut dialog = ConfirmationDialog::new();

        assert!(dialog.request_remove_from_cart(&cart, ProductId::new(9)).is_none());
        assert!(dialog.request_clear_cart(&cart).is_none());
        assert!(dialog.request_remove_favorite(&favorites, ProductId::new(9)).is_none());
        assert!(dialog.request_clear_favorites(&favorites).is_none());
        assert!(dialog.pending().is_none());
    }

    #[test]
    fn test_confirm_remove_and_clear() {
        let (cart, favorites) = containers();
        cart.add_item(product(1));
        cart.add_item(product(2));
        favorites.add_favorite(product(3));
        let mut dialog = ConfirmationDialog::new();

        let prompt = dialog.request_remove_from_cart(&cart, ProductId::new(1)).unwrap();
        assert_eq!(prompt.description, "Remove Figma 1 from your cart?");
        dialog.confirm(&cart, &favorites);
        assert!(!cart.is_in_cart(ProductId::new(1)));

        let prompt = dialog.request_clear_cart(&cart).unwrap();
        assert_eq!(prompt.description, "Remove all 1 item from your cart?");
        dialog.confirm(&cart, &favorites);
        assert!(cart.is_empty());

        dialog.request_clear_favorites(&favorites).unwrap();
        assert_eq!(
            dialog.pending(),
            Some(&PendingAction::ClearFavorites { item_count: 1 })
        );
        dialog.confirm(&cart, &favorites);
        assert!(favorites.is_empty());
    }
}
