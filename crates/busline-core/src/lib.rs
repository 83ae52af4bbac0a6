//! Busline Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the Busline booking engine. It includes:
//!
//! - Domain models (Trip, Ticket, Coupon, Itinerary, etc.)
//! - The transactional store traits the booking services run against
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod traits;

pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
