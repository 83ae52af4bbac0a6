//! HTTP request handlers

pub mod balance;
pub mod booking;
pub mod company;
pub mod health;
pub mod ticket;
pub mod trip;

pub use balance::configure as configure_balance;
pub use booking::configure as configure_bookings;
pub use company::configure as configure_company;
pub use health::health_check;
pub use ticket::configure as configure_tickets;
pub use trip::configure as configure_trips;
