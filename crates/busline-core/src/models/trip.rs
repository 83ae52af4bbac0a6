//! Trip model
//!
//! A trip is an immutable route descriptor owned by a bus company. Seats are
//! numbered `1..=capacity` and the capacity is fixed by the bus layout.

use crate::error::AppError;
use crate::AppResult;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Bus seating layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusType {
    /// Two seats on each side of the aisle, 40 seats
    #[serde(rename = "2+2")]
    TwoPlusTwo,
    /// Two seats on one side and one on the other, 30 seats
    #[serde(rename = "2+1")]
    TwoPlusOne,
}

impl fmt::Display for BusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusType::TwoPlusTwo => write!(f, "2+2"),
            BusType::TwoPlusOne => write!(f, "2+1"),
        }
    }
}

impl BusType {
    /// Parse from the layout label stored in the database
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "2+2" => Some(BusType::TwoPlusTwo),
            "2+1" => Some(BusType::TwoPlusOne),
            _ => None,
        }
    }

    /// Number of seats the layout provides
    pub fn capacity(&self) -> i32 {
        match self {
            BusType::TwoPlusTwo => 40,
            BusType::TwoPlusOne => 30,
        }
    }
}

/// Trip entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub company_id: Uuid,
    pub departure_city: String,
    pub destination_city: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub bus_type: BusType,
    pub capacity: i32,
    /// Price of a single seat
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    /// Whether `seat` is a valid seat number on this trip
    pub fn has_seat(&self, seat: i32) -> bool {
        (1..=self.capacity).contains(&seat)
    }

    /// Whether the bus has already left at `now`
    pub fn has_departed(&self, now: DateTime<Utc>) -> bool {
        self.departure_time < now
    }
}

/// Trip creation request, validated before it becomes a [`Trip`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrip {
    pub company_id: Uuid,
    pub departure_city: String,
    pub destination_city: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub bus_type: BusType,
    pub price: Decimal,
}

impl NewTrip {
    /// Check the route rules and build the trip; capacity comes from the layout
    pub fn into_trip(self, now: DateTime<Utc>) -> AppResult<Trip> {
        let departure_city = self.departure_city.trim().to_string();
        let destination_city = self.destination_city.trim().to_string();

        if departure_city.is_empty() || destination_city.is_empty() {
            return Err(AppError::Validation("All fields are required.".to_string()));
        }
        if departure_city.eq_ignore_ascii_case(&destination_city) {
            return Err(AppError::Validation(
                "Departure and destination cities must be different.".to_string(),
            ));
        }
        if self.price <= Decimal::ZERO {
            return Err(AppError::Validation(
                "Price must be greater than zero.".to_string(),
            ));
        }
        if self.departure_time <= now {
            return Err(AppError::Validation(
                "Departure time must be in the future.".to_string(),
            ));
        }
        if self.arrival_time <= self.departure_time {
            return Err(AppError::Validation(
                "Arrival time must be after departure time.".to_string(),
            ));
        }

        let duration = self.arrival_time - self.departure_time;
        if duration < Duration::minutes(30) {
            return Err(AppError::Validation(
                "Trip duration must be at least 30 minutes.".to_string(),
            ));
        }
        if duration > Duration::hours(24) {
            return Err(AppError::Validation(
                "Trip duration cannot exceed 24 hours.".to_string(),
            ));
        }

        Ok(Trip {
            id: Uuid::new_v4(),
            company_id: self.company_id,
            departure_city,
            destination_city,
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            bus_type: self.bus_type,
            capacity: self.bus_type.capacity(),
            price: self.price,
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn new_trip(now: DateTime<Utc>) -> NewTrip {
        NewTrip {
            company_id: Uuid::new_v4(),
            departure_city: "Ankara".to_string(),
            destination_city: "Izmir".to_string(),
            departure_time: now + Duration::days(2),
            arrival_time: now + Duration::days(2) + Duration::hours(8),
            bus_type: BusType::TwoPlusOne,
            price: dec!(450.00),
        }
    }

    #[test]
    fn test_bus_type_capacity() {
        assert_eq!(BusType::TwoPlusTwo.capacity(), 40);
        assert_eq!(BusType::TwoPlusOne.capacity(), 30);
        assert_eq!(BusType::from_str("2+1"), Some(BusType::TwoPlusOne));
        assert_eq!(BusType::from_str("3+1"), None);
        assert_eq!(BusType::TwoPlusTwo.to_string(), "2+2");
    }

    #[test]
    fn test_bus_type_serde_uses_layout_label() {
        let json = serde_json::to_string(&BusType::TwoPlusTwo).unwrap();
        assert_eq!(json, "\"2+2\"");
    }

    #[test]
    fn test_new_trip_capacity_follows_layout() {
        let now = Utc::now();
        let trip = new_trip(now).into_trip(now).unwrap();
        assert_eq!(trip.capacity, 30);
        assert!(trip.has_seat(1));
        assert!(trip.has_seat(30));
        assert!(!trip.has_seat(0));
        assert!(!trip.has_seat(31));
    }

    #[test]
    fn test_new_trip_rejects_same_city() {
        let now = Utc::now();
        let mut req = new_trip(now);
        req.destination_city = "ankara".to_string();
        let err = req.into_trip(now).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Departure and destination cities must be different."
        );
    }

    #[test]
    fn test_new_trip_rejects_bad_schedule() {
        let now = Utc::now();

        let mut past = new_trip(now);
        past.departure_time = now - Duration::hours(1);
        assert!(past.into_trip(now).is_err());

        let mut short = new_trip(now);
        short.arrival_time = short.departure_time + Duration::minutes(10);
        assert!(short.into_trip(now).is_err());

        let mut long = new_trip(now);
        long.arrival_time = long.departure_time + Duration::hours(30);
        assert!(long.into_trip(now).is_err());
    }
}
