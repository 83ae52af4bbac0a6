//! PostgreSQL booking store
//!
//! A [`PgBookingTx`] wraps one sqlx transaction. Dropping it without calling
//! `commit` rolls everything back, so an early `?` return in a service is
//! enough to unwind a failed booking.

use super::{coupon_repo, rider_repo, ticket_repo, trip_repo};
use busline_core::{
    models::{
        BalanceTransaction, Coupon, CouponRedemption, RiderTicket, SeatMap, Ticket,
        TicketWithTrip, Trip,
    },
    traits::{BookingStore, BookingTx},
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// PostgreSQL implementation of BookingStore
#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    /// Create a new store over a connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    type Tx = PgBookingTx;

    #[instrument(skip(self))]
    async fn begin(&self) -> AppResult<PgBookingTx> {
        let tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            AppError::Transaction(format!("Failed to begin transaction: {}", e))
        })?;

        debug!("Transaction started");
        Ok(PgBookingTx { tx })
    }

    async fn seat_map(&self, trip_id: Uuid) -> AppResult<Option<SeatMap>> {
        trip_repo::seat_map(&self.pool, trip_id).await
    }

    async fn tickets_for_rider(&self, rider_id: Uuid) -> AppResult<Vec<RiderTicket>> {
        ticket_repo::tickets_for_rider(&self.pool, rider_id).await
    }
}

/// One open PostgreSQL transaction
pub struct PgBookingTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BookingTx for PgBookingTx {
    async fn lock_trip(&mut self, trip_id: Uuid) -> AppResult<Option<Trip>> {
        trip_repo::lock_trip(&mut *self.tx, trip_id).await
    }

    async fn find_trip(&mut self, trip_id: Uuid) -> AppResult<Option<Trip>> {
        trip_repo::find_trip(&mut *self.tx, trip_id).await
    }

    async fn taken_seats(&mut self, trip_id: Uuid) -> AppResult<Vec<i32>> {
        trip_repo::taken_seats(&mut *self.tx, trip_id).await
    }

    async fn insert_trip(&mut self, trip: &Trip) -> AppResult<()> {
        trip_repo::insert_trip(&mut *self.tx, trip).await
    }

    async fn delete_trip(&mut self, trip_id: Uuid) -> AppResult<()> {
        trip_repo::delete_trip(&mut *self.tx, trip_id).await
    }

    async fn company_name(&mut self, company_id: Uuid) -> AppResult<Option<String>> {
        trip_repo::company_name(&mut *self.tx, company_id).await
    }

    async fn lock_coupons_by_code(&mut self, code: &str) -> AppResult<Vec<Coupon>> {
        coupon_repo::lock_by_code(&mut *self.tx, code).await
    }

    async fn find_coupons_by_code(&mut self, code: &str) -> AppResult<Vec<Coupon>> {
        coupon_repo::find_by_code(&mut *self.tx, code).await
    }

    async fn coupon_code_exists(&mut self, code: &str, company_id: Option<Uuid>) -> AppResult<bool> {
        coupon_repo::code_exists(&mut *self.tx, code, company_id).await
    }

    async fn insert_coupon(&mut self, coupon: &Coupon) -> AppResult<()> {
        coupon_repo::insert_coupon(&mut *self.tx, coupon).await
    }

    async fn redemption_count(&mut self, coupon_id: Uuid) -> AppResult<i64> {
        coupon_repo::redemption_count(&mut *self.tx, coupon_id).await
    }

    async fn has_redeemed(&mut self, coupon_id: Uuid, rider_id: Uuid) -> AppResult<bool> {
        coupon_repo::has_redeemed(&mut *self.tx, coupon_id, rider_id).await
    }

    async fn insert_redemption(&mut self, redemption: &CouponRedemption) -> AppResult<()> {
        coupon_repo::insert_redemption(&mut *self.tx, redemption).await
    }

    async fn lock_balance(&mut self, rider_id: Uuid) -> AppResult<Option<Decimal>> {
        rider_repo::lock_balance(&mut *self.tx, rider_id).await
    }

    async fn set_balance(&mut self, rider_id: Uuid, balance: Decimal) -> AppResult<()> {
        rider_repo::set_balance(&mut *self.tx, rider_id, balance).await
    }

    async fn record_balance_transaction(&mut self, entry: &BalanceTransaction) -> AppResult<()> {
        rider_repo::record_transaction(&mut *self.tx, entry).await
    }

    async fn insert_ticket(&mut self, ticket: &Ticket) -> AppResult<()> {
        ticket_repo::insert_ticket(&mut *self.tx, ticket).await
    }

    async fn lock_ticket(&mut self, ticket_id: Uuid) -> AppResult<Option<TicketWithTrip>> {
        ticket_repo::lock_ticket(&mut *self.tx, ticket_id).await
    }

    async fn cancel_ticket(&mut self, ticket_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        ticket_repo::cancel_ticket(&mut *self.tx, ticket_id, at).await
    }

    async fn lock_active_tickets(&mut self, trip_id: Uuid) -> AppResult<Vec<Ticket>> {
        ticket_repo::lock_active_tickets(&mut *self.tx, trip_id).await
    }

    #[instrument(skip(self))]
    async fn commit(self) -> AppResult<()> {
        self.tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        debug!("Transaction committed");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn rollback(self) -> AppResult<()> {
        self.tx.rollback().await.map_err(|e| {
            error!("Failed to roll back transaction: {}", e);
            AppError::Transaction(format!("Failed to roll back transaction: {}", e))
        })
    }
}
