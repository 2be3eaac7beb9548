//! Product snapshots and cart line items.
//!
//! A [`Product`] is the snapshot of catalog data captured when a figurine is
//! added to the cart or favorited. Documents keep the camelCase JSON shape
//! the storefront has always written, so a [`LineItem`] serializes as the
//! product's fields with a `quantity` next to them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// Snapshot of a catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub brand: String,
    /// Current selling price in pesos.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Price before markdown, when on sale.
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub image: String,
    /// Figure scale, e.g. `1/7`.
    #[serde(default)]
    pub scale: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub franchise: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u32>,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub on_sale: bool,
    #[serde(default)]
    pub is_limited: bool,
}

impl Product {
    /// Create a product snapshot with only the required fields set.
    #[must_use]
    pub fn new(id: ProductId, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id,
            name: name.into(),
            brand: String::new(),
            price,
            original_price: None,
            image: String::new(),
            scale: String::new(),
            category: String::new(),
            franchise: None,
            description: None,
            stock: None,
            rating: None,
            review_count: None,
            is_new: false,
            on_sale: false,
            is_limited: false,
        }
    }

    /// Whether the product can currently be shipped.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.stock.is_some_and(|stock| stock > 0)
    }
}

/// A cart entry: a product snapshot plus a positive quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(flatten)]
    pub product: Product,
    pub quantity: u32,
}

impl LineItem {
    /// Create a line item for a freshly added product.
    #[must_use]
    pub const fn new(product: Product) -> Self {
        Self {
            product,
            quantity: 1,
        }
    }

    #[must_use]
    pub const fn id(&self) -> ProductId {
        self.product.id
    }

    /// `price * quantity`, unrounded.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}
