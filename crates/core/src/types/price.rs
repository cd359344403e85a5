//! Price formatting using decimal arithmetic.
//!
//! Prices arrive from the backend as plain JSON numbers in the store's single
//! currency. They are held as [`Decimal`] so subtotals never accumulate binary
//! floating point error.

use rust_decimal::{Decimal, RoundingStrategy};

/// Format an amount for display with two decimal places (e.g., `$35.00`).
///
/// ```
/// use rust_decimal::Decimal;
/// use shopfront_core::format_price;
///
/// assert_eq!(format_price(Decimal::new(35, 0)), "$35.00");
/// assert_eq!(format_price(Decimal::new(19999, 3)), "$20.00");
/// ```
#[must_use]
pub fn format_price(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("${rounded:.2}")
}
