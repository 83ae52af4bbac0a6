//! Cancellation and refund flow
//!
//! Cancelling flips the ticket to CANCELLED and credits its full recorded
//! price back to the owner in the same transaction. Its seats become free
//! because only ACTIVE tickets hold seats.

use crate::{balance_ledger, constants::CANCELLATION_CUTOFF_SECS};
use busline_core::{
    models::{CancellationResult, Requester, TicketStatus, TicketWithTrip, TransactionType, TripDeletion},
    traits::{BookingStore, BookingTx},
    AppError, AppResult,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Reverses committed bookings
pub struct CancellationFlow<S: BookingStore> {
    store: Arc<S>,
}

impl<S: BookingStore> CancellationFlow<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Cancel one ticket for its owner or for the company running the trip
    #[instrument(skip(self))]
    pub async fn cancel(&self, ticket_id: Uuid, requester: Requester) -> AppResult<CancellationResult> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let found = tx
            .lock_ticket(ticket_id)
            .await?
            .ok_or_else(|| AppError::TicketNotFound(ticket_id.to_string()))?;

        authorize(&found, requester)?;
        check_cancellable(&found, now)?;

        let ticket = found.ticket;
        tx.cancel_ticket(ticket.id, now).await?;
        let new_balance = balance_ledger::credit(
            &mut tx,
            ticket.rider_id,
            ticket.total_price,
            TransactionType::Refund,
            Some(ticket.id.to_string()),
        )
        .await?;

        tx.commit().await?;

        info!(
            "Ticket {} cancelled, refunded {} to rider {}",
            ticket.id, ticket.total_price, ticket.rider_id
        );

        Ok(CancellationResult {
            ticket_id: ticket.id,
            rider_id: ticket.rider_id,
            refund_amount: ticket.total_price,
            new_balance,
        })
    }

    /// Delete a company's trip, cancelling and refunding every ACTIVE ticket on it.
    ///
    /// Operator-initiated, so the departure cutoff does not apply.
    #[instrument(skip(self))]
    pub async fn delete_trip(&self, trip_id: Uuid, company_id: Uuid) -> AppResult<TripDeletion> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let trip = tx
            .lock_trip(trip_id)
            .await?
            .ok_or_else(|| AppError::TripNotFound(trip_id.to_string()))?;

        if trip.company_id != company_id {
            warn!("Company {} tried to delete trip {} of another company", company_id, trip_id);
            return Err(AppError::PermissionDenied(
                "You can only delete your own company trips.".to_string(),
            ));
        }

        // Sorted by owner, so balance rows are locked in ascending rider id
        let tickets = tx.lock_active_tickets(trip_id).await?;
        let mut refunded_total = Decimal::ZERO;

        for ticket in &tickets {
            tx.cancel_ticket(ticket.id, now).await?;
            balance_ledger::credit(
                &mut tx,
                ticket.rider_id,
                ticket.total_price,
                TransactionType::Refund,
                Some(ticket.id.to_string()),
            )
            .await?;
            refunded_total += ticket.total_price;
        }

        tx.delete_trip(trip_id).await?;
        tx.commit().await?;

        info!(
            "Trip {} deleted, {} booking(s) cancelled, {} refunded",
            trip_id,
            tickets.len(),
            refunded_total
        );

        Ok(TripDeletion {
            trip_id,
            cancelled_tickets: tickets.len(),
            refunded_total,
        })
    }
}

fn authorize(found: &TicketWithTrip, requester: Requester) -> AppResult<()> {
    match requester {
        Requester::Rider(rider_id) if found.ticket.rider_id == rider_id => Ok(()),
        Requester::Rider(_) => Err(AppError::PermissionDenied(
            "You do not have permission to cancel this ticket.".to_string(),
        )),
        Requester::CompanyOperator { company_id } if found.company_id == company_id => Ok(()),
        Requester::CompanyOperator { .. } => Err(AppError::PermissionDenied(
            "You can only cancel bookings for your own company trips.".to_string(),
        )),
    }
}

/// Status first, then the departure cutoff
fn check_cancellable(found: &TicketWithTrip, now: DateTime<Utc>) -> AppResult<()> {
    if found.ticket.status == TicketStatus::Cancelled {
        return Err(AppError::AlreadyCancelled);
    }
    if found.departure_time - now < Duration::seconds(CANCELLATION_CUTOFF_SECS) {
        return Err(AppError::CancellationWindowClosed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use busline_core::models::Ticket;
    use rust_decimal_macros::dec;

    fn found(departure_in: Duration) -> TicketWithTrip {
        TicketWithTrip {
            ticket: Ticket::new(Uuid::new_v4(), Uuid::new_v4(), vec![1], dec!(50), dec!(0)),
            company_id: Uuid::new_v4(),
            departure_time: Utc::now() + departure_in,
        }
    }

    #[test]
    fn test_authorize() {
        let f = found(Duration::days(1));
        assert!(authorize(&f, Requester::Rider(f.ticket.rider_id)).is_ok());
        assert!(authorize(&f, Requester::CompanyOperator { company_id: f.company_id }).is_ok());

        let err = authorize(&f, Requester::Rider(Uuid::new_v4())).unwrap_err();
        assert_eq!(err.to_string(), "You do not have permission to cancel this ticket.");
        assert!(matches!(
            authorize(&f, Requester::CompanyOperator { company_id: Uuid::new_v4() }),
            Err(AppError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_cutoff_boundary() {
        let now = Utc::now();
        let mut f = found(Duration::zero());

        f.departure_time = now + Duration::minutes(30);
        assert!(matches!(
            check_cancellable(&f, now),
            Err(AppError::CancellationWindowClosed)
        ));

        f.departure_time = now + Duration::seconds(CANCELLATION_CUTOFF_SECS);
        assert!(check_cancellable(&f, now).is_ok());

        f.departure_time = now - Duration::hours(2);
        assert!(check_cancellable(&f, now).is_err());
    }

    #[test]
    fn test_cancelled_reported_before_cutoff() {
        let mut f = found(Duration::minutes(10));
        f.ticket.status = TicketStatus::Cancelled;
        assert!(matches!(
            check_cancellable(&f, Utc::now()),
            Err(AppError::AlreadyCancelled)
        ));
    }
}
