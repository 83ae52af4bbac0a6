//! Repository implementations
//!
//! Each `*_repo` module holds the sqlx queries for one table family as free
//! functions over a `PgConnection`. [`PgBookingStore`] stitches them together
//! behind the store traits defined in busline-core.

mod booking_store;
mod coupon_repo;
mod rider_repo;
mod ticket_repo;
mod trip_repo;

pub use booking_store::{PgBookingStore, PgBookingTx};
