//! Order summary shown next to the cart.
//!
//! Shipping is free above [`FREE_SHIPPING_THRESHOLD`], promo codes take a
//! percentage off the subtotal or waive shipping, and 12% VAT is charged on
//! the discounted subtotal. Amounts are left unrounded; rounding is a display
//! concern handled by [`crate::format_price`].

use rust_decimal::Decimal;

/// Subtotals strictly above this ship for free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(4000, 0, 0, false, 0);

/// Flat shipping fee below the threshold.
pub const SHIPPING_FEE: Decimal = Decimal::from_parts(200, 0, 0, false, 0);

/// Philippine VAT.
pub const VAT_RATE: Decimal = Decimal::from_parts(12, 0, 0, false, 2);

/// What a promo code grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoKind {
    /// Percentage off the subtotal.
    Percentage(u32),
    FreeShipping,
}

/// A recognized promo code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Promo {
    pub code: &'static str,
    pub kind: PromoKind,
    pub description: &'static str,
}

const PROMOS: &[Promo] = &[
    Promo {
        code: "SAVE10",
        kind: PromoKind::Percentage(10),
        description: "10% off your order",
    },
    Promo {
        code: "FREESHIP",
        kind: PromoKind::FreeShipping,
        description: "Free shipping",
    },
    Promo {
        code: "WELCOME20",
        kind: PromoKind::Percentage(20),
        description: "20% off for new customers",
    },
];

impl Promo {
    /// Look up a promo code, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn lookup(code: &str) -> Option<Self> {
        let code = code.trim();
        PROMOS
            .iter()
            .find(|promo| promo.code.eq_ignore_ascii_case(code))
            .copied()
    }
}

/// Cart totals broken down for checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSummary {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl OrderSummary {
    /// Compute the summary for a cart subtotal and an optional promo.
    #[must_use]
    pub fn compute(subtotal: Decimal, promo: Option<&Promo>) -> Self {
        let mut shipping = if subtotal > FREE_SHIPPING_THRESHOLD || subtotal.is_zero() {
            Decimal::ZERO
        } else {
            SHIPPING_FEE
        };

        let discount = match promo.map(|p| p.kind) {
            Some(PromoKind::Percentage(percent)) => {
                subtotal * Decimal::from(percent) / Decimal::ONE_HUNDRED
            }
            Some(PromoKind::FreeShipping) => {
                shipping = Decimal::ZERO;
                Decimal::ZERO
            }
            None => Decimal::ZERO,
        };

        let tax = (subtotal - discount) * VAT_RATE;
        let total = subtotal + shipping + tax - discount;

        Self {
            subtotal,
            shipping,
            discount,
            tax,
            total,
        }
    }
}
