//! Cart commands.

use rust_decimal::Decimal;
use shopfront_client::checkout::complete_checkout;
use shopfront_client::{AddOutcome, CheckoutOutcome, QuantityOutcome};
use shopfront_core::{CartItem, ProductId, format_price};
use tracing::{info, warn};

use super::{CommandError, Shell};

/// Print every line and the subtotal.
pub fn show(shell: &Shell) {
    let cart = shell.ctx.cart().snapshot();
    if cart.is_empty() {
        info!("Cart is empty");
        return;
    }

    for item in &cart {
        info!(
            "{:<24} {:>3} x {:>10} = {:>10}  [{}]",
            item.name,
            item.quantity,
            format_price(item.price),
            format_price(item.line_total()),
            item.id
        );
    }
    info!(
        "{} line(s), {} item(s), subtotal {}",
        cart.badge_count(),
        cart.total_quantity(),
        format_price(cart.subtotal())
    );
}

/// Add a product to the cart.
///
/// With `offline` set the line is built from the given name and price;
/// otherwise the product is looked up in the catalog.
///
/// # Errors
///
/// Returns an error if the product cannot be found, the quantity is zero, or
/// storage cannot be written.
pub async fn add(
    shell: &Shell,
    id: &str,
    offline: Option<(String, Decimal)>,
    quantity: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = ProductId::new(id);

    let item = if let Some((name, price)) = offline {
        CartItem {
            id: id.clone(),
            name,
            price,
            quantity,
            image_url: None,
        }
    } else {
        let products = shell.api.products().await?;
        let product = products
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| CommandError::UnknownProduct(id.to_string()))?;
        CartItem::from_product(product, quantity)
    };

    match shell.ctx.cart().add_item(item)? {
        AddOutcome::Added => info!("Added {id} to cart"),
        AddOutcome::AlreadyInCart => warn!("{id} is already in the cart"),
        AddOutcome::InvalidQuantity => return Err(CommandError::InvalidQuantity.into()),
    }
    Ok(())
}

/// Set a line's quantity.
///
/// # Errors
///
/// Returns an error if the quantity is zero, the line is missing, or storage
/// cannot be written.
pub fn set_quantity(
    shell: &Shell,
    id: &str,
    quantity: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = ProductId::new(id);
    let outcome = shell.ctx.cart().set_quantity(&id, quantity)?;
    report(shell, &id, outcome)
}

/// Increase a line's quantity by one.
///
/// # Errors
///
/// Returns an error if the line is missing or storage cannot be written.
pub fn increment(shell: &Shell, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let id = ProductId::new(id);
    let outcome = shell.ctx.cart().increment(&id)?;
    report(shell, &id, outcome)
}

/// Decrease a line's quantity by one, stopping at one.
///
/// # Errors
///
/// Returns an error if the line is missing or storage cannot be written.
pub fn decrement(shell: &Shell, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let id = ProductId::new(id);
    match shell.ctx.cart().decrement(&id)? {
        // Already at one.
        QuantityOutcome::Rejected => {
            info!("{id} is already at quantity 1");
            Ok(())
        }
        outcome => report(shell, &id, outcome),
    }
}

/// Remove a line.
///
/// # Errors
///
/// Returns an error if storage cannot be written.
pub fn remove(shell: &Shell, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let id = ProductId::new(id);
    if shell.ctx.cart().remove_item(&id)? {
        info!("Removed {id} from cart");
    } else {
        warn!("{id} was not in the cart");
    }
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if storage cannot be written.
pub fn clear(shell: &Shell) -> Result<(), Box<dyn std::error::Error>> {
    shell.ctx.cart().clear()?;
    info!("Cart cleared");
    Ok(())
}

/// Finish a checkout after the payment provider redirected back.
///
/// # Errors
///
/// Returns an error if the payment cannot be fetched or storage cannot be
/// written.
pub async fn checkout_complete(
    shell: &Shell,
    payment_id: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    match complete_checkout(&shell.api, &shell.ctx, payment_id).await? {
        CheckoutOutcome::Completed => info!("Payment confirmed, cart cleared"),
        CheckoutOutcome::AwaitingPayment { status } => {
            warn!("Payment is {status}; cart kept until it is paid");
        }
    }
    Ok(())
}

fn report(
    shell: &Shell,
    id: &ProductId,
    outcome: QuantityOutcome,
) -> Result<(), Box<dyn std::error::Error>> {
    match outcome {
        QuantityOutcome::Updated => {
            let cart = shell.ctx.cart().snapshot();
            if let Some(item) = cart.get(id) {
                info!("{id} now at quantity {}", item.quantity);
            }
            Ok(())
        }
        QuantityOutcome::Rejected => Err(CommandError::InvalidQuantity.into()),
        QuantityOutcome::NotFound => Err(CommandError::NotInCart(id.to_string()).into()),
    }
}
