//! Authentication and authorization for Busline
//!
//! Identity arrives as a signed HS256 bearer token. This crate validates the
//! token and exposes the caller to actix-web handlers through extractors:
//!
//! - [`AuthenticatedUser`] - any valid token
//! - [`RiderUser`] - a rider, the only role that books and holds a balance
//! - [`CompanyUser`] - an operator acting for one bus company
//!
//! # Example
//!
//! ```no_run
//! use actix_web::HttpResponse;
//! use busline_auth::RiderUser;
//!
//! async fn my_tickets(rider: RiderUser) -> HttpResponse {
//!     HttpResponse::Ok().json(serde_json::json!({ "rider": rider.user_id }))
//! }
//! ```

pub mod claims;
pub mod jwt;
pub mod middleware;

pub use claims::Claims;
pub use jwt::JwtService;
pub use middleware::{AuthenticatedUser, CompanyUser, RiderUser};
