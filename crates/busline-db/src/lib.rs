//! Busline Database Layer
//!
//! This crate provides the storage implementations of the booking engine:
//!
//! - Connection pool management and migrations with sqlx
//! - `PgBookingStore`, the PostgreSQL implementation of `BookingStore`
//! - `MemoryBookingStore`, an in-process store with the same transaction
//!   semantics, used by service and HTTP tests (behind the `testing`
//!   feature)

#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod pool;
pub mod repositories;

#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryBookingStore;
pub use pool::{create_pool, run_migrations};
pub use repositories::{PgBookingStore, PgBookingTx};

// Re-export commonly used types
pub use busline_core::{AppError, AppResult};
pub use sqlx::{PgPool, Postgres, Transaction};
