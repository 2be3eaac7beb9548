//! Catalog browsing and the order summary.

use std::io::Write;

use figurine_core::catalog::ProductFilter;
use figurine_core::checkout::Promo;
use figurine_core::format_price;

use super::{CliError, Context, print_product};

pub fn list(ctx: &Context, out: &mut impl Write, filter: &ProductFilter) -> Result<(), CliError> {
    let products = filter.apply(&ctx.catalog);
    for product in &products {
        print_product(out, product)?;
    }
    let active = filter.active_count();
    write!(out, "{} of {} products", products.len(), ctx.catalog.len())?;
    if active > 0 {
        write!(out, " ({active} filter(s) active)")?;
    }
    writeln!(out)?;
    Ok(())
}

/// Print the checkout breakdown for the current cart.
pub fn summary(ctx: &Context, out: &mut impl Write, promo_code: Option<&str>) -> Result<(), CliError> {
    let promo = match promo_code {
        Some(code) => {
            let promo = Promo::lookup(code);
            if promo.is_none() {
                writeln!(out, "Promo code {code:?} is not valid; continuing without it.")?;
            }
            promo
        }
        None => None,
    };

    let summary = ctx.session.order_summary(promo.as_ref());
    writeln!(out, "Subtotal  {:>12}", format_price(summary.subtotal))?;
    if summary.shipping.is_zero() {
        writeln!(out, "Shipping  {:>12}", "FREE")?;
    } else {
        writeln!(out, "Shipping  {:>12}", format_price(summary.shipping))?;
    }
    if let Some(promo) = promo {
        writeln!(out, "Promo     {:>12}  {} ({})", format!("-{}", format_price(summary.discount)), promo.code, promo.description)?;
    }
    writeln!(out, "VAT (12%) {:>12}", format_price(summary.tax))?;
    writeln!(out, "Total     {:>12}", format_price(summary.total))?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use figurine_core::ProductId;
    use figurine_storefront::StorefrontConfig;

    use super::*;

    fn open(dir: &tempfile::TempDir) -> Context {
        Context::open(&StorefrontConfig {
            data_dir: dir.path().to_path_buf(),
            ..StorefrontConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_filters_bundled_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = open(&dir);
        let filter = ProductFilter {
            brand: Some("Hot Toys".to_string()),
            ..ProductFilter::default()
        };

        let mut out = Vec::new();
        list(&ctx, &mut out, &filter).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Iron Man Mark 85"));
        assert!(!out.contains("Halo Master Chief"));
        assert!(out.contains("4 of 12 products (1 filter(s) active)"));
        ctx.close().await;
    }

    #[tokio::test]
    async fn test_summary_with_promo() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = open(&dir);
        ctx.session.cart().add_item(ctx.product(ProductId::new(1)).unwrap());

        let mut out = Vec::new();
        summary(&ctx, &mut out, Some("save10")).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("₱8,500"));
        assert!(out.contains("FREE"));
        assert!(out.contains("-₱850"));
        assert!(out.contains("₱918"));
        assert!(out.contains("₱8,568"));
        ctx.close().await;
    }
}
