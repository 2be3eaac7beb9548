//! Favorites commands.

use std::io::Write;

use figurine_core::ProductId;

use super::{CliError, Context, print_product, print_prompt};

pub fn show(ctx: &Context, out: &mut impl Write) -> Result<(), CliError> {
    let favorites = ctx.session.favorites().items();
    if favorites.is_empty() {
        writeln!(out, "No favorites yet.")?;
        return Ok(());
    }
    for product in &favorites {
        print_product(out, product)?;
    }
    writeln!(out, "{} favorite(s)", favorites.len())?;
    Ok(())
}

/// Add or remove a favorite. Removal goes through the dialog.
pub fn toggle(ctx: &mut Context, out: &mut impl Write, id: ProductId, yes: bool) -> Result<(), CliError> {
    let product = ctx.product(id)?;
    let favorites = ctx.session.favorites().clone();

    if !favorites.is_favorite(id) {
        favorites.add_favorite(product.clone());
        writeln!(out, "Added {} to your favorites.", product.name)?;
        return Ok(());
    }

    let Some(prompt) = ctx.dialog.request_remove_favorite(&favorites, id) else {
        return Ok(());
    };
    if yes {
        ctx.dialog.confirm(ctx.session.cart(), &favorites);
        writeln!(out, "Removed {} from your favorites.", product.name)?;
    } else {
        ctx.dialog.cancel();
        print_prompt(out, &prompt)?;
    }
    Ok(())
}

pub fn clear(ctx: &mut Context, out: &mut impl Write, yes: bool) -> Result<(), CliError> {
    let favorites = ctx.session.favorites().clone();
    let Some(prompt) = ctx.dialog.request_clear_favorites(&favorites) else {
        writeln!(out, "No favorites to clear.")?;
        return Ok(());
    };
    if yes {
        ctx.dialog.confirm(ctx.session.cart(), &favorites);
        writeln!(out, "Favorites cleared.")?;
    } else {
        ctx.dialog.cancel();
        print_prompt(out, &prompt)?;
    }
    Ok(())
}

pub fn move_to_cart(ctx: &Context, out: &mut impl Write) -> Result<(), CliError> {
    let moved = ctx.session.move_favorites_to_cart();
    if moved == 0 {
        writeln!(out, "No favorites to add.")?;
    } else {
        writeln!(out, "Added {moved} favorite(s) to your cart.")?;
    }
    Ok(())
}
