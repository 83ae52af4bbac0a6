//! Seat ledger
//!
//! A seat is taken iff an ACTIVE ticket holds it. `reserve` only decides
//! whether a selection fits; the caller writes the ticket and its holds in the
//! same transaction, while the trip row lock taken by `lock_trip` keeps any
//! other reservation on that trip waiting.

use busline_core::{models::Trip, traits::BookingTx, AppError, AppResult};
use std::collections::HashSet;
use tracing::{debug, instrument, warn};

/// Shape checks that need no trip data: non-empty, positive, no repeats
pub fn check_request(seats: &[i32]) -> AppResult<()> {
    if seats.is_empty() {
        return Err(AppError::Validation(
            "Please select at least one seat.".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(seats.len());
    for &seat in seats {
        if seat < 1 {
            return Err(AppError::InvalidSeat(format!(
                "Seat {} does not exist on this bus.",
                seat
            )));
        }
        if !seen.insert(seat) {
            return Err(AppError::InvalidSeat(format!(
                "Seat {} was selected more than once.",
                seat
            )));
        }
    }

    Ok(())
}

/// Check that `seats` can be sold on `trip`.
///
/// The trip must already be locked by `tx`.
#[instrument(skip(tx, trip), fields(trip_id = %trip.id))]
pub async fn reserve<T: BookingTx>(tx: &mut T, trip: &Trip, seats: &[i32]) -> AppResult<()> {
    check_request(seats)?;

    if let Some(seat) = seats.iter().find(|&&seat| !trip.has_seat(seat)) {
        return Err(AppError::InvalidSeat(format!(
            "Seat {} does not exist on this bus.",
            seat
        )));
    }

    let taken: HashSet<i32> = tx.taken_seats(trip.id).await?.into_iter().collect();

    if let Some(&seat) = seats.iter().find(|seat| taken.contains(seat)) {
        warn!("Seat {} on trip {} is already taken", seat, trip.id);
        return Err(AppError::SeatConflict { seat });
    }

    if taken.len() + seats.len() > trip.capacity as usize {
        warn!(
            "Trip {} is full: {} taken, {} requested, capacity {}",
            trip.id,
            taken.len(),
            seats.len(),
            trip.capacity
        );
        return Err(AppError::CapacityExceeded);
    }

    debug!("Seats {:?} available on trip {}", seats, trip.id);
    Ok(())
}
