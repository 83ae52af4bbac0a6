//! Booking orchestrator
//!
//! One booking is one transaction:
//!
//! 1. lock every leg's trip (ascending trip id) and check its seats
//! 2. price the legs and validate the coupon, if any
//! 3. debit the rider
//! 4. write one ticket per leg, then the coupon redemption
//!
//! Any error drops the transaction, which rolls back every step before it.

use crate::{balance_ledger, constants::DISCOUNT_TYPE_PERCENTAGE, coupon_validator, fare, seat_ledger};
use busline_core::{
    config::{BookingConfig, DiscountAllocation},
    models::{
        BookingResult, CouponPreview, CouponRedemption, Discount, Itinerary, Leg, Ticket,
        TransactionType, Trip,
    },
    traits::{BookingStore, BookingTx},
    AppError, AppResult,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Books one-way and round trips for riders
pub struct BookingOrchestrator<S: BookingStore> {
    store: Arc<S>,
    allocation: DiscountAllocation,
}

impl<S: BookingStore> BookingOrchestrator<S> {
    pub fn new(store: Arc<S>, config: &BookingConfig) -> Self {
        Self {
            store,
            allocation: config.discount_allocation,
        }
    }

    /// Book every leg of `itinerary` for the rider, all or nothing
    #[instrument(skip(self, itinerary), fields(trip_type = itinerary.trip_type()))]
    pub async fn book(
        &self,
        rider_id: Uuid,
        itinerary: &Itinerary,
        coupon_code: Option<&str>,
    ) -> AppResult<BookingResult> {
        let legs = check_itinerary(itinerary)?;
        let coupon_code = coupon_code.map(str::trim).filter(|c| !c.is_empty());
        let now = Utc::now();

        let mut tx = self.store.begin().await?;

        let trips = lock_trips(&mut tx, &legs).await?;
        let mut subtotals = Vec::with_capacity(legs.len());
        let mut company_ids = Vec::with_capacity(legs.len());

        for (leg, trip) in legs.iter().zip(trips.iter()) {
            if trip.has_departed(now) {
                return Err(AppError::Validation(
                    "This trip has already departed.".to_string(),
                ));
            }
            seat_ledger::reserve(&mut tx, trip, &leg.seats).await?;
            subtotals.push(fare::price_leg(trip, leg.seats.len())?);
            company_ids.push(trip.company_id);
        }

        let subtotal = fare::total(&subtotals);
        let discount = match coupon_code {
            Some(code) => Some(
                coupon_validator::validate(&mut tx, code, rider_id, &company_ids, subtotal, now)
                    .await?,
            ),
            None => None,
        };
        let discount_amount = discount.as_ref().map_or(Decimal::ZERO, |d| d.amount);
        let amount_paid = fare::apply_discount(subtotal, discount_amount);

        let tickets = self.issue_tickets(rider_id, &legs, &subtotals, discount_amount);
        let ticket_ids: Vec<Uuid> = tickets.iter().map(|t| t.id).collect();

        let new_balance = balance_ledger::debit(
            &mut tx,
            rider_id,
            amount_paid,
            TransactionType::BookingDebit,
            Some(join_ids(&ticket_ids)),
        )
        .await?;

        for ticket in &tickets {
            tx.insert_ticket(ticket).await?;
        }

        if let Some(discount) = &discount {
            tx.insert_redemption(&CouponRedemption::new(discount.coupon_id, rider_id))
                .await?;
        }

        tx.commit().await?;

        info!(
            "Rider {} booked {} ticket(s), paid {} (subtotal {}, discount {})",
            rider_id,
            ticket_ids.len(),
            amount_paid,
            subtotal,
            discount_amount
        );

        Ok(BookingResult {
            ticket_ids,
            subtotal,
            amount_paid,
            new_balance,
            coupon_used: discount.map(|d| d.code),
            discount_applied: discount_amount,
        })
    }

    /// Price `itinerary` with `coupon_code` without booking anything.
    ///
    /// Seat availability is not checked; the read transaction is always
    /// rolled back.
    #[instrument(skip(self, itinerary))]
    pub async fn preview_coupon(
        &self,
        rider_id: Uuid,
        itinerary: &Itinerary,
        coupon_code: &str,
    ) -> AppResult<CouponPreview> {
        if coupon_code.trim().is_empty() {
            return Err(AppError::Validation(
                "Coupon code is required.".to_string(),
            ));
        }
        let legs = check_itinerary(itinerary)?;

        let mut tx = self.store.begin().await?;
        let outcome = preview_in(&mut tx, rider_id, &legs, coupon_code).await;
        tx.rollback().await?;

        let (subtotal, discount) = outcome?;
        Ok(CouponPreview {
            coupon_code: discount.code,
            discount_percentage: discount.percentage,
            discount_type: DISCOUNT_TYPE_PERCENTAGE.to_string(),
            original_amount: subtotal,
            discount_amount: discount.amount,
            final_amount: fare::apply_discount(subtotal, discount.amount),
        })
    }

    /// One ACTIVE ticket per leg, priced per the configured allocation
    fn issue_tickets(
        &self,
        rider_id: Uuid,
        legs: &[Leg],
        subtotals: &[Decimal],
        discount: Decimal,
    ) -> Vec<Ticket> {
        let shares = match self.allocation {
            DiscountAllocation::Prorate => fare::allocate_discount(subtotals, discount),
            DiscountAllocation::LegSubtotal => vec![Decimal::ZERO; legs.len()],
        };

        legs.iter()
            .zip(subtotals.iter().zip(shares))
            .map(|(leg, (subtotal, share))| {
                Ticket::new(
                    leg.trip_id,
                    rider_id,
                    leg.seats.clone(),
                    *subtotal - share,
                    share,
                )
            })
            .collect()
    }
}

/// Shape checks done before any transaction is opened
fn check_itinerary(itinerary: &Itinerary) -> AppResult<Vec<Leg>> {
    itinerary.validate()?;
    let legs = itinerary.legs();
    for leg in &legs {
        seat_ledger::check_request(&leg.seats)?;
    }
    Ok(legs)
}

/// Lock every leg's trip in ascending id order; returns trips in leg order
async fn lock_trips<T: BookingTx>(tx: &mut T, legs: &[Leg]) -> AppResult<Vec<Trip>> {
    let mut ids: Vec<Uuid> = legs.iter().map(|leg| leg.trip_id).collect();
    ids.sort();
    ids.dedup();

    let mut locked = HashMap::with_capacity(ids.len());
    for id in ids {
        let trip = tx.lock_trip(id).await?.ok_or_else(|| {
            warn!("Booking refers to unknown trip {}", id);
            AppError::TripNotFound(id.to_string())
        })?;
        debug!("Locked trip {}", id);
        locked.insert(id, trip);
    }

    legs.iter()
        .map(|leg| {
            locked
                .get(&leg.trip_id)
                .cloned()
                .ok_or_else(|| AppError::TripNotFound(leg.trip_id.to_string()))
        })
        .collect()
}

async fn preview_in<T: BookingTx>(
    tx: &mut T,
    rider_id: Uuid,
    legs: &[Leg],
    coupon_code: &str,
) -> AppResult<(Decimal, Discount)> {
    let mut subtotals = Vec::with_capacity(legs.len());
    let mut company_ids = Vec::with_capacity(legs.len());

    for leg in legs {
        let trip = tx
            .find_trip(leg.trip_id)
            .await?
            .ok_or_else(|| AppError::TripNotFound(leg.trip_id.to_string()))?;
        subtotals.push(fare::price_leg(&trip, leg.seats.len())?);
        company_ids.push(trip.company_id);
    }

    let subtotal = fare::total(&subtotals);
    let discount =
        coupon_validator::check(tx, coupon_code, rider_id, &company_ids, subtotal, Utc::now())
            .await?;
    Ok((subtotal, discount))
}

fn join_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
