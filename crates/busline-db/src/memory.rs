//! In-process booking store
//!
//! `MemoryBookingStore` keeps every table in one `State` behind an async
//! mutex. A transaction owns the lock for its whole lifetime and works on a
//! private copy of the state: `commit` publishes the copy, dropping or
//! rolling back throws it away. Transactions are therefore fully serialized,
//! which gives the same observable outcomes as the row locks taken by the
//! PostgreSQL store. The constraints enforced by the schema (non-negative
//! balance, one redemption per rider, foreign keys) are checked here too.

use async_trait::async_trait;
use busline_core::{
    models::{
        BalanceTransaction, BookedSeat, Company, Coupon, CouponRedemption, RiderTicket, SeatMap,
        Ticket, TicketStatus, TicketWithTrip, Trip, User, UserRole,
    },
    traits::{BookingStore, BookingTx},
    AppError, AppResult,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct State {
    companies: HashMap<Uuid, Company>,
    users: HashMap<Uuid, User>,
    trips: HashMap<Uuid, Trip>,
    coupons: HashMap<Uuid, Coupon>,
    redemptions: Vec<CouponRedemption>,
    tickets: HashMap<Uuid, Ticket>,
    balance_transactions: Vec<BalanceTransaction>,
}

impl State {
    fn active_tickets(&self, trip_id: Uuid) -> impl Iterator<Item = &Ticket> {
        self.tickets
            .values()
            .filter(move |t| t.trip_id == trip_id && t.is_active())
    }

    /// Oldest first, like the SQL query
    fn coupons_by_code(&self, code: &str) -> Vec<Coupon> {
        let mut coupons: Vec<Coupon> = self
            .coupons
            .values()
            .filter(|c| c.code == code)
            .cloned()
            .collect();
        coupons.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        coupons
    }
}

/// In-memory implementation of BookingStore
#[derive(Clone, Default)]
pub struct MemoryBookingStore {
    state: Arc<Mutex<State>>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Seeding ====================

    pub async fn add_company(&self, name: &str) -> Uuid {
        let company = Company {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        let id = company.id;
        self.state.lock().await.companies.insert(id, company);
        id
    }

    pub async fn add_user(&self, user: User) -> Uuid {
        let id = user.id;
        self.state.lock().await.users.insert(id, user);
        id
    }

    /// Rider with the given balance
    pub async fn add_rider(&self, balance: Decimal) -> Uuid {
        self.add_user(User {
            id: Uuid::new_v4(),
            full_name: "Test Rider".to_string(),
            email: format!("{}@riders.test", Uuid::new_v4().simple()),
            role: UserRole::User,
            company_id: None,
            balance,
            gender: None,
            created_at: Utc::now(),
        })
        .await
    }

    /// Operator account for a company
    pub async fn add_operator(&self, company_id: Uuid) -> Uuid {
        self.add_user(User {
            id: Uuid::new_v4(),
            full_name: "Test Operator".to_string(),
            email: format!("{}@operators.test", Uuid::new_v4().simple()),
            role: UserRole::Company,
            company_id: Some(company_id),
            balance: Decimal::ZERO,
            gender: None,
            created_at: Utc::now(),
        })
        .await
    }

    /// Store a trip as-is, bypassing creation rules (e.g. a trip leaving in 30 minutes)
    pub async fn add_trip(&self, trip: Trip) -> Uuid {
        let id = trip.id;
        self.state.lock().await.trips.insert(id, trip);
        id
    }

    pub async fn add_coupon(&self, coupon: Coupon) -> Uuid {
        let id = coupon.id;
        self.state.lock().await.coupons.insert(id, coupon);
        id
    }

    /// Record a redemption outside of any booking
    pub async fn add_redemption(&self, coupon_id: Uuid, rider_id: Uuid) {
        self.state
            .lock()
            .await
            .redemptions
            .push(CouponRedemption::new(coupon_id, rider_id));
    }

    // ==================== Inspection ====================

    pub async fn balance(&self, rider_id: Uuid) -> Option<Decimal> {
        self.state.lock().await.users.get(&rider_id).map(|u| u.balance)
    }

    pub async fn ticket(&self, ticket_id: Uuid) -> Option<Ticket> {
        self.state.lock().await.tickets.get(&ticket_id).cloned()
    }

    pub async fn trip(&self, trip_id: Uuid) -> Option<Trip> {
        self.state.lock().await.trips.get(&trip_id).cloned()
    }

    pub async fn coupon_redemptions(&self, coupon_id: Uuid) -> usize {
        self.state
            .lock()
            .await
            .redemptions
            .iter()
            .filter(|r| r.coupon_id == coupon_id)
            .count()
    }

    /// Audit entries of a rider, oldest first
    pub async fn balance_transactions(&self, rider_id: Uuid) -> Vec<BalanceTransaction> {
        self.state
            .lock()
            .await
            .balance_transactions
            .iter()
            .filter(|e| e.rider_id == rider_id)
            .cloned()
            .collect()
    }

    /// Seat numbers currently held by ACTIVE tickets, ascending
    pub async fn taken_seats(&self, trip_id: Uuid) -> Vec<i32> {
        let state = self.state.lock().await;
        let mut seats: Vec<i32> = state
            .active_tickets(trip_id)
            .flat_map(|t| t.seats.iter().copied())
            .collect();
        seats.sort_unstable();
        seats
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    type Tx = MemoryBookingTx;

    async fn begin(&self) -> AppResult<MemoryBookingTx> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        debug!("Memory transaction started");
        Ok(MemoryBookingTx { guard, work })
    }

    async fn seat_map(&self, trip_id: Uuid) -> AppResult<Option<SeatMap>> {
        let state = self.state.lock().await;
        let Some(trip) = state.trips.get(&trip_id) else {
            return Ok(None);
        };

        let mut booked_seats: Vec<BookedSeat> = state
            .active_tickets(trip_id)
            .flat_map(|ticket| {
                let gender = state
                    .users
                    .get(&ticket.rider_id)
                    .and_then(|u| u.gender.clone());
                ticket.seats.iter().map(move |&seat_number| BookedSeat {
                    seat_number,
                    gender: gender.clone(),
                })
            })
            .collect();
        booked_seats.sort_by_key(|s| s.seat_number);

        Ok(Some(SeatMap {
            trip_id,
            bus_type: trip.bus_type,
            capacity: trip.capacity,
            booked_seats,
        }))
    }

    async fn tickets_for_rider(&self, rider_id: Uuid) -> AppResult<Vec<RiderTicket>> {
        let state = self.state.lock().await;
        let mut tickets = Vec::new();

        for ticket in state.tickets.values().filter(|t| t.rider_id == rider_id) {
            let trip = state.trips.get(&ticket.trip_id).ok_or_else(|| {
                AppError::Database(format!("Ticket {} references a missing trip", ticket.id))
            })?;
            let company_name = state
                .companies
                .get(&trip.company_id)
                .map(|c| c.name.clone())
                .ok_or_else(|| {
                    AppError::Database(format!("Trip {} references a missing company", trip.id))
                })?;

            tickets.push(RiderTicket {
                ticket: ticket.clone(),
                trip: trip.clone(),
                company_name,
            });
        }

        tickets.sort_by(|a, b| {
            b.ticket
                .created_at
                .cmp(&a.ticket.created_at)
                .then(a.ticket.id.cmp(&b.ticket.id))
        });
        Ok(tickets)
    }
}

/// One open in-memory transaction
pub struct MemoryBookingTx {
    guard: OwnedMutexGuard<State>,
    work: State,
}

#[async_trait]
impl BookingTx for MemoryBookingTx {
    async fn lock_trip(&mut self, trip_id: Uuid) -> AppResult<Option<Trip>> {
        Ok(self.work.trips.get(&trip_id).cloned())
    }

    async fn find_trip(&mut self, trip_id: Uuid) -> AppResult<Option<Trip>> {
        Ok(self.work.trips.get(&trip_id).cloned())
    }

    async fn taken_seats(&mut self, trip_id: Uuid) -> AppResult<Vec<i32>> {
        let mut seats: Vec<i32> = self
            .work
            .active_tickets(trip_id)
            .flat_map(|t| t.seats.iter().copied())
            .collect();
        seats.sort_unstable();
        Ok(seats)
    }

    async fn insert_trip(&mut self, trip: &Trip) -> AppResult<()> {
        if !self.work.companies.contains_key(&trip.company_id) {
            return Err(AppError::Database(format!(
                "Company {} does not exist",
                trip.company_id
            )));
        }
        self.work.trips.insert(trip.id, trip.clone());
        Ok(())
    }

    async fn delete_trip(&mut self, trip_id: Uuid) -> AppResult<()> {
        self.work.trips.remove(&trip_id);
        self.work.tickets.retain(|_, t| t.trip_id != trip_id);
        Ok(())
    }

    async fn company_name(&mut self, company_id: Uuid) -> AppResult<Option<String>> {
        Ok(self.work.companies.get(&company_id).map(|c| c.name.clone()))
    }

    async fn lock_coupons_by_code(&mut self, code: &str) -> AppResult<Vec<Coupon>> {
        Ok(self.work.coupons_by_code(code))
    }

    async fn find_coupons_by_code(&mut self, code: &str) -> AppResult<Vec<Coupon>> {
        Ok(self.work.coupons_by_code(code))
    }

    async fn coupon_code_exists(&mut self, code: &str, company_id: Option<Uuid>) -> AppResult<bool> {
        Ok(self
            .work
            .coupons
            .values()
            .any(|c| c.code == code && c.company_id == company_id))
    }

    async fn insert_coupon(&mut self, coupon: &Coupon) -> AppResult<()> {
        self.work.coupons.insert(coupon.id, coupon.clone());
        Ok(())
    }

    async fn redemption_count(&mut self, coupon_id: Uuid) -> AppResult<i64> {
        let count = self
            .work
            .redemptions
            .iter()
            .filter(|r| r.coupon_id == coupon_id)
            .count();
        Ok(count as i64)
    }

    async fn has_redeemed(&mut self, coupon_id: Uuid, rider_id: Uuid) -> AppResult<bool> {
        Ok(self
            .work
            .redemptions
            .iter()
            .any(|r| r.coupon_id == coupon_id && r.rider_id == rider_id))
    }

    async fn insert_redemption(&mut self, redemption: &CouponRedemption) -> AppResult<()> {
        let duplicate = self
            .work
            .redemptions
            .iter()
            .any(|r| r.coupon_id == redemption.coupon_id && r.rider_id == redemption.rider_id);
        if duplicate {
            return Err(AppError::Database(
                "duplicate key value violates unique constraint on coupon_redemptions".to_string(),
            ));
        }
        self.work.redemptions.push(redemption.clone());
        Ok(())
    }

    async fn lock_balance(&mut self, rider_id: Uuid) -> AppResult<Option<Decimal>> {
        Ok(self.work.users.get(&rider_id).map(|u| u.balance))
    }

    async fn set_balance(&mut self, rider_id: Uuid, balance: Decimal) -> AppResult<()> {
        if balance < Decimal::ZERO {
            return Err(AppError::Database(
                "new row for relation users violates check constraint on balance".to_string(),
            ));
        }
        if let Some(user) = self.work.users.get_mut(&rider_id) {
            user.balance = balance;
        }
        Ok(())
    }

    async fn record_balance_transaction(&mut self, entry: &BalanceTransaction) -> AppResult<()> {
        self.work.balance_transactions.push(entry.clone());
        Ok(())
    }

    async fn insert_ticket(&mut self, ticket: &Ticket) -> AppResult<()> {
        if !self.work.trips.contains_key(&ticket.trip_id) {
            return Err(AppError::Database(format!(
                "Trip {} does not exist",
                ticket.trip_id
            )));
        }
        self.work.tickets.insert(ticket.id, ticket.clone());
        Ok(())
    }

    async fn lock_ticket(&mut self, ticket_id: Uuid) -> AppResult<Option<TicketWithTrip>> {
        let Some(ticket) = self.work.tickets.get(&ticket_id) else {
            return Ok(None);
        };
        let trip = self.work.trips.get(&ticket.trip_id).ok_or_else(|| {
            AppError::Database(format!("Ticket {} references a missing trip", ticket_id))
        })?;

        Ok(Some(TicketWithTrip {
            ticket: ticket.clone(),
            company_id: trip.company_id,
            departure_time: trip.departure_time,
        }))
    }

    async fn cancel_ticket(&mut self, ticket_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        match self.work.tickets.get_mut(&ticket_id) {
            Some(ticket) if ticket.is_active() => {
                ticket.status = TicketStatus::Cancelled;
                ticket.cancelled_at = Some(at);
                Ok(())
            }
            _ => Err(AppError::AlreadyCancelled),
        }
    }

    async fn lock_active_tickets(&mut self, trip_id: Uuid) -> AppResult<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self.work.active_tickets(trip_id).cloned().collect();
        tickets.sort_by(|a, b| a.rider_id.cmp(&b.rider_id).then(a.id.cmp(&b.id)));
        Ok(tickets)
    }

    async fn commit(self) -> AppResult<()> {
        let MemoryBookingTx { mut guard, work } = self;
        *guard = work;
        debug!("Memory transaction committed");
        Ok(())
    }

    async fn rollback(self) -> AppResult<()> {
        debug!("Memory transaction rolled back");
        Ok(())
    }
}
