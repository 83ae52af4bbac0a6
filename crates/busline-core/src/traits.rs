//! Storage abstractions for the booking engine
//!
//! The services never talk to a database directly. They open a
//! [`BookingTx`] from a [`BookingStore`], perform every read and write of one
//! business operation through it, then commit. Dropping or rolling back the
//! transaction discards all of its writes.
//!
//! Methods prefixed with `lock_` take a row lock that is held until the
//! transaction ends. Callers acquire locks in this order: trips (ascending
//! id), coupon, ticket, balances (ascending rider id).

use crate::error::AppError;
use crate::models::{
    BalanceTransaction, Coupon, CouponRedemption, RiderTicket, SeatMap, Ticket, TicketWithTrip,
    Trip,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Entry point to the transactional data store
#[async_trait]
pub trait BookingStore: Send + Sync + 'static {
    /// Transaction handle type
    type Tx: BookingTx;

    /// Open a new transaction
    async fn begin(&self) -> Result<Self::Tx, AppError>;

    /// Seat occupancy of a trip, `None` if the trip does not exist
    async fn seat_map(&self, trip_id: Uuid) -> Result<Option<SeatMap>, AppError>;

    /// All tickets of a rider with their trips, newest first
    async fn tickets_for_rider(&self, rider_id: Uuid) -> Result<Vec<RiderTicket>, AppError>;
}

/// One open transaction against the data store
#[async_trait]
pub trait BookingTx: Send {
    // ==================== Trips ====================

    /// Find a trip and lock its row for the rest of the transaction
    async fn lock_trip(&mut self, trip_id: Uuid) -> Result<Option<Trip>, AppError>;

    /// Find a trip without locking it
    async fn find_trip(&mut self, trip_id: Uuid) -> Result<Option<Trip>, AppError>;

    /// Seat numbers held by ACTIVE tickets of the trip
    async fn taken_seats(&mut self, trip_id: Uuid) -> Result<Vec<i32>, AppError>;

    /// Persist a new trip
    async fn insert_trip(&mut self, trip: &Trip) -> Result<(), AppError>;

    /// Remove a trip and everything that references it
    async fn delete_trip(&mut self, trip_id: Uuid) -> Result<(), AppError>;

    /// Display name of a company
    async fn company_name(&mut self, company_id: Uuid) -> Result<Option<String>, AppError>;

    // ==================== Coupons ====================

    /// Every coupon with this normalized code, locked
    async fn lock_coupons_by_code(&mut self, code: &str) -> Result<Vec<Coupon>, AppError>;

    /// Every coupon with this normalized code, without taking row locks
    async fn find_coupons_by_code(&mut self, code: &str) -> Result<Vec<Coupon>, AppError>;

    /// Whether a coupon with this code already exists in the company scope
    async fn coupon_code_exists(
        &mut self,
        code: &str,
        company_id: Option<Uuid>,
    ) -> Result<bool, AppError>;

    /// Persist a new coupon
    async fn insert_coupon(&mut self, coupon: &Coupon) -> Result<(), AppError>;

    /// Number of committed redemptions of the coupon
    async fn redemption_count(&mut self, coupon_id: Uuid) -> Result<i64, AppError>;

    /// Whether the rider already redeemed the coupon
    async fn has_redeemed(&mut self, coupon_id: Uuid, rider_id: Uuid) -> Result<bool, AppError>;

    /// Record a redemption
    async fn insert_redemption(&mut self, redemption: &CouponRedemption) -> Result<(), AppError>;

    // ==================== Balances ====================

    /// Current balance of a rider, locked; `None` if the rider does not exist
    async fn lock_balance(&mut self, rider_id: Uuid) -> Result<Option<Decimal>, AppError>;

    /// Overwrite a rider's balance
    async fn set_balance(&mut self, rider_id: Uuid, balance: Decimal) -> Result<(), AppError>;

    /// Append a balance audit entry
    async fn record_balance_transaction(
        &mut self,
        entry: &BalanceTransaction,
    ) -> Result<(), AppError>;

    // ==================== Tickets ====================

    /// Persist a ticket together with its seat holds
    async fn insert_ticket(&mut self, ticket: &Ticket) -> Result<(), AppError>;

    /// Find a ticket with its trip facts and lock the ticket row
    async fn lock_ticket(&mut self, ticket_id: Uuid) -> Result<Option<TicketWithTrip>, AppError>;

    /// Flip an ACTIVE ticket to CANCELLED
    async fn cancel_ticket(&mut self, ticket_id: Uuid, at: DateTime<Utc>)
        -> Result<(), AppError>;

    /// ACTIVE tickets of a trip, locked
    async fn lock_active_tickets(&mut self, trip_id: Uuid) -> Result<Vec<Ticket>, AppError>;

    // ==================== Boundary ====================

    /// Make every write of this transaction durable
    async fn commit(self) -> Result<(), AppError>;

    /// Discard every write of this transaction
    async fn rollback(self) -> Result<(), AppError>;
}
