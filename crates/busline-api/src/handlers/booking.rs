//! Booking handlers
//!
//! HTTP handlers for booking seats and previewing coupons.

use crate::dto::{ApiResponse, BookingRequest};
use actix_web::{web, HttpResponse};
use busline_auth::RiderUser;
use busline_core::traits::BookingStore;
use busline_core::AppError;
use busline_services::BookingOrchestrator;
use tracing::{info, instrument};

/// Book a one-way or round trip
///
/// POST /api/v1/bookings
#[instrument(skip_all, fields(rider_id = %rider.user_id))]
pub async fn create_booking<S: BookingStore>(
    orchestrator: web::Data<BookingOrchestrator<S>>,
    rider: RiderUser,
    req: web::Json<BookingRequest>,
) -> Result<HttpResponse, AppError> {
    let itinerary = req.itinerary()?;

    let result = orchestrator
        .book(rider.user_id, &itinerary, req.coupon_code())
        .await?;

    info!(
        tickets = result.ticket_ids.len(),
        amount_paid = %result.amount_paid,
        "Booking completed"
    );

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        result,
        "Booking completed successfully!",
    )))
}

/// Price a prospective booking with a coupon, without booking
///
/// POST /api/v1/bookings/coupon-preview
#[instrument(skip_all, fields(rider_id = %rider.user_id))]
pub async fn preview_coupon<S: BookingStore>(
    orchestrator: web::Data<BookingOrchestrator<S>>,
    rider: RiderUser,
    req: web::Json<BookingRequest>,
) -> Result<HttpResponse, AppError> {
    let code = req
        .coupon_code()
        .ok_or_else(|| AppError::Validation("Coupon code is required.".to_string()))?;
    let itinerary = req.itinerary()?;

    let preview = orchestrator
        .preview_coupon(rider.user_id, &itinerary, code)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        preview,
        "Coupon applied successfully!",
    )))
}

/// Configure booking routes
pub fn configure<S: BookingStore>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bookings")
            .route("", web::post().to(create_booking::<S>))
            .route("/coupon-preview", web::post().to(preview_coupon::<S>)),
    );
}
