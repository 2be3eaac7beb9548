//! Peso price formatting and discount math.
//!
//! Prices are whole-peso or centavo amounts held as [`Decimal`] so that cart
//! totals never pick up floating point noise. Formatting follows the `en-PH`
//! locale: comma thousands separators and at most three fraction digits with
//! trailing zeros dropped.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Philippine peso sign.
pub const PESO_SIGN: char = '₱';

/// Fraction digits kept when formatting.
const MAX_FRACTION_DIGITS: u32 = 3;

/// Format an amount in Philippine pesos, e.g. `₱8,500` or `₱1,234.5`.
#[must_use]
pub fn format_price(amount: Decimal) -> String {
    format!("{PESO_SIGN}{}", group_thousands(amount))
}

/// Format a price range for the catalog filter, e.g. `₱1,000 - ₱5,000`.
///
/// An open-ended range renders as `₱10,000+`.
#[must_use]
pub fn format_price_range(min: Decimal, max: Option<Decimal>) -> String {
    let min = format_price(min);
    match max {
        Some(max) => format!("{min} - {}", format_price(max)),
        None => format!("{min}+"),
    }
}

/// Percentage discount of `sale` against `original`, rounded half-up.
///
/// Returns 0 when there is no markdown.
#[must_use]
pub fn calculate_discount(original: Decimal, sale: Decimal) -> u32 {
    if original <= sale || original <= Decimal::ZERO {
        return 0;
    }
    ((original - sale) / original * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(0)
}

/// Formatted amount saved by buying at `sale` instead of `original`.
#[must_use]
pub fn calculate_savings(original: Decimal, sale: Decimal) -> String {
    format_price(original - sale)
}

fn group_thousands(amount: Decimal) -> String {
    let rounded = amount
        .round_dp_with_strategy(MAX_FRACTION_DIGITS, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let text = rounded.abs().to_string();
    let (int_part, frac_part) = text
        .split_once('.')
        .map_or((text.as_str(), None), |(int, frac)| (int, Some(frac)));

    let mut out = String::with_capacity(text.len() + text.len() / 3 + 1);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        out.push('-');
    }
    let len = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}
