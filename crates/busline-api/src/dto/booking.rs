//! Booking DTOs
//!
//! The booking body arrives loosely shaped; [`BookingRequest::itinerary`]
//! turns it into a one-way or round-trip [`Itinerary`] or rejects it.

use busline_core::models::Itinerary;
use busline_core::{AppError, AppResult};
use serde::Deserialize;
use uuid::Uuid;

/// Booking and coupon preview request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingRequest {
    /// "one_way" or "round"
    pub trip_type: Option<String>,

    pub trip_id: Option<Uuid>,
    pub seats: Option<Vec<i32>>,

    pub departure_trip: Option<Uuid>,
    pub return_trip: Option<Uuid>,
    pub departure_seats: Option<Vec<i32>>,
    pub return_seats: Option<Vec<i32>>,

    pub coupon_code: Option<String>,
}

fn missing_trip_information() -> AppError {
    AppError::Validation("Missing trip information.".to_string())
}

impl BookingRequest {
    pub fn itinerary(&self) -> AppResult<Itinerary> {
        let seats = |s: &Option<Vec<i32>>| {
            s.clone()
                .filter(|seats| !seats.is_empty())
                .ok_or_else(missing_trip_information)
        };

        match self.trip_type.as_deref().map(str::trim) {
            Some("one_way") => Ok(Itinerary::OneWay {
                trip_id: self.trip_id.ok_or_else(missing_trip_information)?,
                seats: seats(&self.seats)?,
            }),
            Some("round") => Ok(Itinerary::RoundTrip {
                departure_trip: self.departure_trip.ok_or_else(missing_trip_information)?,
                return_trip: self.return_trip.ok_or_else(missing_trip_information)?,
                departure_seats: seats(&self.departure_seats)?,
                return_seats: seats(&self.return_seats)?,
            }),
            _ => Err(AppError::Validation("Invalid trip type.".to_string())),
        }
    }

    /// Trimmed coupon code, `None` when absent or blank
    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}
