//! Booking request and outcome models
//!
//! An [`Itinerary`] is the only accepted booking shape: either a one-way trip
//! or a round trip with exactly two legs.

use crate::error::AppError;
use crate::models::trip::BusType;
use crate::AppResult;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seat selection for one trip of a booking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leg {
    pub trip_id: Uuid,
    pub seats: Vec<i32>,
}

/// What the rider asked to book
///
/// Built by the HTTP layer from the loose request body, never deserialized
/// directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Itinerary {
    OneWay {
        trip_id: Uuid,
        seats: Vec<i32>,
    },
    RoundTrip {
        departure_trip: Uuid,
        return_trip: Uuid,
        departure_seats: Vec<i32>,
        return_seats: Vec<i32>,
    },
}

impl Itinerary {
    /// Legs in travel order, departure first
    pub fn legs(&self) -> Vec<Leg> {
        match self {
            Itinerary::OneWay { trip_id, seats } => vec![Leg {
                trip_id: *trip_id,
                seats: seats.clone(),
            }],
            Itinerary::RoundTrip {
                departure_trip,
                return_trip,
                departure_seats,
                return_seats,
            } => vec![
                Leg {
                    trip_id: *departure_trip,
                    seats: departure_seats.clone(),
                },
                Leg {
                    trip_id: *return_trip,
                    seats: return_seats.clone(),
                },
            ],
        }
    }

    pub fn trip_type(&self) -> &'static str {
        match self {
            Itinerary::OneWay { .. } => "one_way",
            Itinerary::RoundTrip { .. } => "round",
        }
    }

    /// Structural checks that need no trip data
    pub fn validate(&self) -> AppResult<()> {
        if let Itinerary::RoundTrip {
            departure_trip,
            return_trip,
            ..
        } = self
        {
            if departure_trip == return_trip {
                return Err(AppError::Validation(
                    "Departure and return trips must be different.".to_string(),
                ));
            }
        }

        if self.legs().iter().any(|leg| leg.seats.is_empty()) {
            return Err(AppError::Validation(
                "Missing trip information.".to_string(),
            ));
        }

        Ok(())
    }
}

/// Who asks for a cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requester {
    /// The rider who bought the ticket
    Rider(Uuid),
    /// An operator acting for the company that runs the trip
    CompanyOperator { company_id: Uuid },
}

/// A coupon that passed validation, with its discount for the booking subtotal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discount {
    pub coupon_id: Uuid,
    pub code: String,
    pub percentage: Decimal,
    pub amount: Decimal,
}

/// Committed booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingResult {
    /// One ticket per leg, departure first
    pub ticket_ids: Vec<Uuid>,
    pub subtotal: Decimal,
    pub amount_paid: Decimal,
    pub new_balance: Decimal,
    pub coupon_used: Option<String>,
    pub discount_applied: Decimal,
}

/// Side-effect free coupon check for a prospective booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponPreview {
    pub coupon_code: String,
    pub discount_percentage: Decimal,
    pub discount_type: String,
    pub original_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
}

/// Committed cancellation of a single ticket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationResult {
    pub ticket_id: Uuid,
    pub rider_id: Uuid,
    pub refund_amount: Decimal,
    /// Balance of the ticket owner after the refund
    pub new_balance: Decimal,
}

/// Committed deletion of a trip together with its bookings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripDeletion {
    pub trip_id: Uuid,
    pub cancelled_tickets: usize,
    pub refunded_total: Decimal,
}

/// Occupied seat on the seat map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedSeat {
    pub seat_number: i32,
    pub gender: Option<String>,
}

/// Seat occupancy for one trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatMap {
    pub trip_id: Uuid,
    pub bus_type: BusType,
    pub capacity: i32,
    /// Ordered by seat number
    pub booked_seats: Vec<BookedSeat>,
}
