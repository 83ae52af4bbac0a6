//! API layer for Busline
//!
//! HTTP handlers for booking, cancellation, balance top-ups and company
//! trip management. Handlers are generic over the
//! [`BookingStore`](busline_core::traits::BookingStore), so the same routes
//! run against PostgreSQL in production and the in-memory store in tests.

#![forbid(unsafe_code)]

pub mod dto;
pub mod handlers;

use actix_web::{error::InternalError, web, HttpResponse};
use busline_core::traits::BookingStore;

pub use dto::ApiResponse;
pub use handlers::{
    configure_balance, configure_bookings, configure_company, configure_tickets, configure_trips,
    health_check,
};

/// Register every route under `/api/v1`
///
/// The services and the `JwtService` are expected in app data.
pub fn configure<S: BookingStore>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .configure(configure_bookings::<S>)
            .configure(configure_tickets::<S>)
            .configure(configure_trips::<S>)
            .configure(configure_balance::<S>)
            .configure(configure_company::<S>),
    );
}

/// JSON body config that reports malformed bodies in the API error format
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(serde_json::json!({
                "error": "invalid_json",
                "message": message,
                "status": 400,
            })),
        )
        .into()
    })
}
