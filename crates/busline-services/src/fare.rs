//! Fare calculation
//!
//! Pure arithmetic over trip prices. All amounts are rounded to cents with
//! midpoint-away-from-zero rounding.

use crate::constants::{MAX_DISCOUNT_PERCENT, MONEY_SCALE};
use busline_core::{models::Trip, AppError, AppResult};
use rust_decimal::{Decimal, RoundingStrategy};

fn to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Price of `seat_count` seats on one trip
pub fn price_leg(trip: &Trip, seat_count: usize) -> AppResult<Decimal> {
    if seat_count == 0 {
        return Err(AppError::Validation(
            "Please select at least one seat.".to_string(),
        ));
    }
    Ok(to_cents(trip.price * Decimal::from(seat_count)))
}

/// Sum of leg subtotals
pub fn total(leg_subtotals: &[Decimal]) -> Decimal {
    leg_subtotals.iter().copied().sum()
}

/// Amount due after the discount, never below zero
pub fn apply_discount(total: Decimal, discount: Decimal) -> Decimal {
    (total - discount).max(Decimal::ZERO)
}

/// Percentage discount on a subtotal, clamped to `[0, subtotal]`
pub fn coupon_discount(subtotal: Decimal, percentage: Decimal) -> Decimal {
    let percentage = percentage.clamp(Decimal::ZERO, MAX_DISCOUNT_PERCENT);
    to_cents(subtotal * percentage / Decimal::ONE_HUNDRED).clamp(Decimal::ZERO, subtotal)
}

/// Split a booking discount over its legs in proportion to their subtotals.
///
/// Every share but the last is rounded to cents; the last leg takes the
/// remainder so the shares always add up to `discount` exactly.
pub fn allocate_discount(leg_subtotals: &[Decimal], discount: Decimal) -> Vec<Decimal> {
    let total = total(leg_subtotals);
    if leg_subtotals.is_empty() || total <= Decimal::ZERO || discount <= Decimal::ZERO {
        return vec![Decimal::ZERO; leg_subtotals.len()];
    }

    let discount = discount.min(total);
    let last = leg_subtotals.len() - 1;
    let mut shares = Vec::with_capacity(leg_subtotals.len());
    let mut allocated = Decimal::ZERO;

    for (i, subtotal) in leg_subtotals.iter().enumerate() {
        let share = if i == last {
            discount - allocated
        } else {
            to_cents(discount * subtotal / total).min(*subtotal)
        };
        allocated += share;
        shares.push(share);
    }

    shares
}
