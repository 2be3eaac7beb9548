//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! figurine cart show
//! figurine cart add 3 --quantity 2
//! figurine cart add 3 --yes        # already in the cart: confirm adding more
//! figurine cart set 3 5
//! figurine cart remove 3 --yes
//! figurine cart clear --yes
//! ```

use std::io::Write;

use figurine_core::{ProductId, format_price};
use figurine_storefront::AddOutcome;

use super::{CliError, Context, print_prompt};

pub fn show(ctx: &Context, out: &mut impl Write) -> Result<(), CliError> {
    let cart = ctx.session.cart();
    let items = cart.items();
    if items.is_empty() {
        writeln!(out, "Your cart is empty.")?;
        return Ok(());
    }
    for item in &items {
        writeln!(
            out,
            "{:>4}  {:<42} {:>3} x {:>10} = {:>10}",
            item.id(),
            item.product.name,
            item.quantity,
            format_price(item.product.price),
            format_price(item.line_total())
        )?;
    }
    writeln!(
        out,
        "{} item(s), {}",
        cart.total_items(),
        format_price(cart.total_price())
    )?;
    Ok(())
}

/// Add `quantity` units. A product already in the cart needs `yes`.
pub fn add(
    ctx: &mut Context,
    out: &mut impl Write,
    id: ProductId,
    quantity: u32,
    yes: bool,
) -> Result<(), CliError> {
    let product = ctx.product(id)?;
    let name = product.name.clone();
    let cart = ctx.session.cart().clone();

    match ctx.dialog.request_add_to_cart(&cart, product, quantity) {
        AddOutcome::Added => writeln!(out, "Added {quantity} x {name} to your cart.")?,
        AddOutcome::NeedsConfirmation(prompt) => {
            if yes {
                ctx.dialog.confirm(&cart, ctx.session.favorites());
                writeln!(
                    out,
                    "Added {quantity} more {name}; you now have {}.",
                    cart.quantity_of(id)
                )?;
            } else {
                ctx.dialog.cancel();
                print_prompt(out, &prompt)?;
            }
        }
    }
    Ok(())
}

pub fn remove(ctx: &mut Context, out: &mut impl Write, id: ProductId, yes: bool) -> Result<(), CliError> {
    let cart = ctx.session.cart().clone();
    let Some(prompt) = ctx.dialog.request_remove_from_cart(&cart, id) else {
        writeln!(out, "Product {id} is not in your cart.")?;
        return Ok(());
    };
    confirm_or_prompt(ctx, out, &prompt, yes)
}

/// Set a quantity directly; zero or less removes the line.
pub fn set(ctx: &Context, out: &mut impl Write, id: ProductId, quantity: i64) -> Result<(), CliError> {
    let cart = ctx.session.cart();
    if !cart.is_in_cart(id) {
        writeln!(out, "Product {id} is not in your cart.")?;
        return Ok(());
    }
    cart.update_quantity(id, quantity);
    if cart.is_in_cart(id) {
        writeln!(out, "Quantity of {id} set to {}.", cart.quantity_of(id))?;
    } else {
        writeln!(out, "Removed {id} from your cart.")?;
    }
    Ok(())
}

pub fn clear(ctx: &mut Context, out: &mut impl Write, yes: bool) -> Result<(), CliError> {
    let cart = ctx.session.cart().clone();
    let Some(prompt) = ctx.dialog.request_clear_cart(&cart) else {
        writeln!(out, "Your cart is already empty.")?;
        return Ok(());
    };
    confirm_or_prompt(ctx, out, &prompt, yes)
}

fn confirm_or_prompt(
    ctx: &mut Context,
    out: &mut impl Write,
    prompt: &figurine_storefront::Prompt,
    yes: bool,
) -> Result<(), CliError> {
    if yes {
        if ctx
            .dialog
            .confirm(ctx.session.cart(), ctx.session.favorites())
            .is_some()
        {
            writeln!(out, "Done.")?;
        }
    } else {
        ctx.dialog.cancel();
        print_prompt(out, prompt)?;
    }
    Ok(())
}
