//! Catalog filtering and sorting.
//!
//! Mirrors the product list sidebar: free-text search, exact-match facets,
//! a price range, stock/sale toggles and a sort order. Filtering never
//! mutates the catalog; it returns the matching products in display order.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::Product;

/// Errors from parsing catalog inputs.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid price range {0:?}, expected MIN-MAX or MIN-")]
    InvalidPriceRange(String),
    #[error("unknown sort order {0:?}")]
    UnknownSort(String),
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse a catalog document (a JSON array of products).
///
/// # Errors
///
/// Returns `CatalogError::Json` if the input is not an array of products.
pub fn parse_catalog(json: &str) -> Result<Vec<Product>, CatalogError> {
    Ok(serde_json::from_str(json)?)
}

/// Inclusive price bounds. A missing upper bound means "and above".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Option<Decimal>,
}

impl PriceRange {
    #[must_use]
    pub fn contains(&self, price: Decimal) -> bool {
        price >= self.min && self.max.is_none_or(|max| price <= max)
    }
}

impl FromStr for PriceRange {
    type Err = CatalogError;

    /// Parses the sidebar's `"min-max"` values. `"10000-"` and `"10000-0"`
    /// are both open-ended.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CatalogError::InvalidPriceRange(s.to_string());
        let (min, max) = s.split_once('-').ok_or_else(invalid)?;
        let min = min.trim().parse::<Decimal>().map_err(|_| invalid())?;
        let max = match max.trim() {
            "" => None,
            raw => {
                let max = raw.parse::<Decimal>().map_err(|_| invalid())?;
                (!max.is_zero()).then_some(max)
            }
        };
        Ok(Self { min, max })
    }
}

/// Display order for filtered products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Name,
    PriceLow,
    PriceHigh,
    Rating,
    Newest,
    Popularity,
}

impl SortBy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::PriceLow => "price-low",
            Self::PriceHigh => "price-high",
            Self::Rating => "rating",
            Self::Newest => "newest",
            Self::Popularity => "popularity",
        }
    }

    fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            Self::Name => a
                .name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name)),
            Self::PriceLow => a.price.cmp(&b.price),
            Self::PriceHigh => b.price.cmp(&a.price),
            Self::Rating => b
                .rating
                .unwrap_or(0.0)
                .total_cmp(&a.rating.unwrap_or(0.0)),
            Self::Newest => b.is_new.cmp(&a.is_new),
            Self::Popularity => b.review_count.unwrap_or(0).cmp(&a.review_count.unwrap_or(0)),
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "price-low" => Ok(Self::PriceLow),
            "price-high" => Ok(Self::PriceHigh),
            "rating" => Ok(Self::Rating),
            "newest" => Ok(Self::Newest),
            "popularity" => Ok(Self::Popularity),
            other => Err(CatalogError::UnknownSort(other.to_string())),
        }
    }
}

/// Product list filter state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub franchise: Option<String>,
    pub scale: Option<String>,
    pub price_range: Option<PriceRange>,
    pub in_stock: bool,
    pub on_sale: bool,
    pub sort_by: SortBy,
}

impl ProductFilter {
    /// Apply the filter and sort order to `products`.
    #[must_use]
    pub fn apply(&self, products: &[Product]) -> Vec<Product> {
        let needle = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut matched: Vec<Product> = products
            .iter()
            .filter(|p| needle.as_deref().is_none_or(|n| matches_search(p, n)))
            .filter(|p| facet_matches(self.category.as_deref(), &p.category))
            .filter(|p| facet_matches(self.brand.as_deref(), &p.brand))
            .filter(|p| {
                self.franchise
                    .as_deref()
                    .is_none_or(|f| p.franchise.as_deref() == Some(f))
            })
            .filter(|p| facet_matches(self.scale.as_deref(), &p.scale))
            .filter(|p| self.price_range.is_none_or(|r| r.contains(p.price)))
            .filter(|p| !self.in_stock || p.in_stock())
            .filter(|p| !self.on_sale || p.on_sale)
            .cloned()
            .collect();

        matched.sort_by(|a, b| self.sort_by.compare(a, b));
        matched
    }

    /// Number of filters that differ from their defaults (search excluded).
    #[must_use]
    pub fn active_count(&self) -> usize {
        [
            self.category.is_some(),
            self.brand.is_some(),
            self.franchise.is_some(),
            self.scale.is_some(),
            self.price_range.is_some(),
            self.in_stock,
            self.on_sale,
            self.sort_by != SortBy::Name,
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }
}

fn facet_matches(wanted: Option<&str>, actual: &str) -> bool {
    wanted.is_none_or(|w| w == actual)
}

fn matches_search(product: &Product, needle: &str) -> bool {
    let hit = |field: &str| field.to_lowercase().contains(needle);
    hit(&product.name)
        || hit(&product.brand)
        || product.franchise.as_deref().is_some_and(hit)
        || product.description.as_deref().is_some_and(hit)
}
