//! Checkout return flow.
//!
//! After the payment provider redirects back, the cart is emptied once the
//! payment is confirmed. A return without a payment id counts as confirmed.

use tracing::{info, instrument};

use crate::api::{ApiClient, ApiError};
use crate::context::ShopContext;
use crate::storage::keys;

/// What the checkout return found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Cart emptied and pending order forgotten.
    Completed,
    /// The payment exists but is not paid yet; the cart is kept.
    AwaitingPayment { status: String },
}

/// Confirm a checkout return and empty the cart once it is paid.
///
/// Other tabs see the emptied cart through the usual storage event.
///
/// # Errors
///
/// Returns an error if the payment cannot be fetched or storage cannot be
/// written. The cart is left as it was on a fetch error.
#[instrument(skip(api, ctx))]
pub async fn complete_checkout(
    api: &ApiClient,
    ctx: &ShopContext,
    payment_id: Option<&str>,
) -> Result<CheckoutOutcome, ApiError> {
    if let Some(id) = payment_id.filter(|id| !id.is_empty()) {
        let payment = api.payment_status(id).await?;
        if !payment.is_paid() {
            info!(status = %payment.status, "Payment not settled, keeping cart");
            return Ok(CheckoutOutcome::AwaitingPayment {
                status: payment.status,
            });
        }
    }

    ctx.cart().clear()?;
    ctx.tab().remove_item(keys::PENDING_ORDER)?;
    info!("Checkout complete, cart cleared");
    Ok(CheckoutOutcome::Completed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use shopfront_core::{CartItem, ProductId};

    use super::*;
    use crate::config::ClientConfig;
    use crate::storage::StorageArea;

    #[tokio::test]
    async fn test_return_without_payment_id_clears_cart() {
        let tab = StorageArea::in_memory().open_tab();
        let config = ClientConfig::default()
            .with_api_url("http://127.0.0.1:9")
            .unwrap();
        let api = ApiClient::new(&config, tab.clone());
        let ctx = ShopContext::open(tab.clone()).unwrap();
        ctx.cart()
            .add_item(CartItem {
                id: ProductId::new("a"),
                name: "Leek".to_string(),
                price: Decimal::ONE,
                quantity: 2,
                image_url: None,
            })
            .unwrap();
        tab.set_item(keys::PENDING_ORDER, r#"{"orderId":"o1"}"#).unwrap();

        let outcome = complete_checkout(&api, &ctx, None).await.unwrap();
        assert_eq!(outcome, CheckoutOutcome::Completed);
        assert!(ctx.cart().snapshot().is_empty());
        assert_eq!(tab.get_item(keys::CART).unwrap().as_deref(), Some("[]"));
        assert_eq!(tab.get_item(keys::PENDING_ORDER).unwrap(), None);
    }
}
