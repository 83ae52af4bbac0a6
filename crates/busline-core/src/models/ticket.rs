//! Ticket and seat hold models
//!
//! A ticket is one purchase unit for one trip. Its seat holds make the seats
//! "taken" only while the ticket is ACTIVE; cancelling the ticket frees them
//! without touching the hold rows.

use crate::models::trip::Trip;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Persisted ticket status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    #[default]
    Active,
    Cancelled,
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketStatus::Active => write!(f, "ACTIVE"),
            TicketStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl TicketStatus {
    /// Parse from the stored label (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Some(TicketStatus::Active),
            "CANCELLED" => Some(TicketStatus::Cancelled),
            _ => None,
        }
    }
}

/// Status shown to riders; EXPIRED is computed, never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplayStatus {
    Active,
    Cancelled,
    Expired,
}

/// Ticket entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub rider_id: Uuid,
    /// Amount this ticket accounts for; refunded in full on cancellation
    pub total_price: Decimal,
    /// Share of a coupon discount already taken off `total_price`
    pub discount: Decimal,
    pub status: TicketStatus,
    pub seats: Vec<i32>,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// New ACTIVE ticket holding `seats`
    pub fn new(
        trip_id: Uuid,
        rider_id: Uuid,
        seats: Vec<i32>,
        total_price: Decimal,
        discount: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            rider_id,
            total_price,
            discount,
            status: TicketStatus::Active,
            seats,
            created_at: Utc::now(),
            cancelled_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TicketStatus::Active
    }

    /// Status relative to `now`; an ACTIVE ticket whose bus has left reads as EXPIRED
    pub fn display_status(&self, departure_time: DateTime<Utc>, now: DateTime<Utc>) -> DisplayStatus {
        match self.status {
            TicketStatus::Cancelled => DisplayStatus::Cancelled,
            TicketStatus::Active if departure_time < now => DisplayStatus::Expired,
            TicketStatus::Active => DisplayStatus::Active,
        }
    }
}

/// A ticket together with the trip facts needed to authorize and time a cancellation
#[derive(Debug, Clone)]
pub struct TicketWithTrip {
    pub ticket: Ticket,
    pub company_id: Uuid,
    pub departure_time: DateTime<Utc>,
}

/// A rider's ticket as loaded from storage, before the display status is derived
#[derive(Debug, Clone)]
pub struct RiderTicket {
    pub ticket: Ticket,
    pub trip: Trip,
    pub company_name: String,
}

impl RiderTicket {
    /// Listing entry with the status as seen at `now`
    pub fn summarize(self, now: DateTime<Utc>) -> TicketSummary {
        let status = self.ticket.display_status(self.trip.departure_time, now);
        TicketSummary {
            ticket_id: self.ticket.id,
            trip_id: self.trip.id,
            company_name: self.company_name,
            departure_city: self.trip.departure_city,
            destination_city: self.trip.destination_city,
            departure_time: self.trip.departure_time,
            arrival_time: self.trip.arrival_time,
            seats: self.ticket.seats,
            total_price: self.ticket.total_price,
            status,
            created_at: self.ticket.created_at,
        }
    }
}

/// Rider-facing ticket listing entry
#[derive(Debug, Clone, Serialize)]
pub struct TicketSummary {
    pub ticket_id: Uuid,
    pub trip_id: Uuid,
    pub company_name: String,
    pub departure_city: String,
    pub destination_city: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub seats: Vec<i32>,
    pub total_price: Decimal,
    pub status: DisplayStatus,
    pub created_at: DateTime<Utc>,
}
