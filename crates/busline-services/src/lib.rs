//! Business logic services for Busline
//!
//! This crate turns a rider's seat selection into durable tickets and
//! reverses them again. Every operation runs inside one transaction opened
//! from a [`BookingStore`](busline_core::traits::BookingStore), so a failure
//! at any step leaves no partial writes behind.
//!
//! # Services
//!
//! - `seat_ledger` - Seat availability checks for one trip
//! - `coupon_validator` - Coupon lookup, eligibility and discount
//! - `fare` - Leg prices, totals and discount allocation
//! - `balance_ledger` - Rider balance debits, credits and deposits
//! - `BookingOrchestrator` - One-way and round-trip bookings
//! - `CancellationFlow` - Ticket cancellation and trip deletion with refunds
//! - `CatalogService` - Trip and coupon creation, seat maps, rider tickets

pub mod balance_ledger;
pub mod booking;
pub mod cancellation;
pub mod catalog;
pub mod coupon_validator;
pub mod fare;
pub mod seat_ledger;

pub use balance_ledger::BalanceService;
pub use booking::BookingOrchestrator;
pub use cancellation::CancellationFlow;
pub use catalog::CatalogService;

/// Business logic constants
pub mod constants {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Riders may not cancel within this many seconds of departure (1 hour)
    pub const CANCELLATION_CUTOFF_SECS: i64 = 3600;

    /// Decimal places kept on every money amount
    pub const MONEY_SCALE: u32 = 2;

    /// Upper bound of a coupon percentage
    pub const MAX_DISCOUNT_PERCENT: Decimal = dec!(100);

    /// Only coupon kind the platform issues
    pub const DISCOUNT_TYPE_PERCENTAGE: &str = "percentage";
}
