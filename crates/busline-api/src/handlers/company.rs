//! Company operator handlers
//!
//! Trip and coupon management plus cancellations on behalf of riders. Every
//! handler acts for the company bound to the operator's token.

use crate::dto::{ApiResponse, CouponCreateRequest, TripCreateRequest};
use actix_web::{web, HttpResponse};
use busline_auth::CompanyUser;
use busline_core::traits::BookingStore;
use busline_core::AppError;
use busline_services::{CancellationFlow, CatalogService};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Cancel a rider's ticket on one of the company's trips
///
/// POST /api/v1/company/tickets/{id}/cancel
#[instrument(skip_all, fields(company_id = %operator.company_id))]
pub async fn cancel_booking<S: BookingStore>(
    cancellation: web::Data<CancellationFlow<S>>,
    path: web::Path<Uuid>,
    operator: CompanyUser,
) -> Result<HttpResponse, AppError> {
    let ticket_id = path.into_inner();

    let result = cancellation
        .cancel(ticket_id, operator.requester())
        .await?;

    info!(%ticket_id, refund = %result.refund_amount, "Ticket cancelled by company");

    let message = format!(
        "Booking cancelled successfully. Customer has been refunded ${:.2}.",
        result.refund_amount
    );
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(result, message)))
}

/// Create a trip for the operator's company
///
/// POST /api/v1/company/trips
#[instrument(skip_all, fields(company_id = %operator.company_id))]
pub async fn create_trip<S: BookingStore>(
    catalog: web::Data<CatalogService<S>>,
    operator: CompanyUser,
    req: web::Json<TripCreateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Trip creation validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let new_trip = req.into_inner().into_new_trip(operator.company_id)?;
    let trip = catalog.create_trip(new_trip).await?;

    info!(trip_id = %trip.id, "Trip created");

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        trip,
        "Trip created successfully!",
    )))
}

/// Delete a trip, cancelling and refunding every active booking on it
///
/// DELETE /api/v1/company/trips/{id}
#[instrument(skip_all, fields(company_id = %operator.company_id))]
pub async fn delete_trip<S: BookingStore>(
    cancellation: web::Data<CancellationFlow<S>>,
    path: web::Path<Uuid>,
    operator: CompanyUser,
) -> Result<HttpResponse, AppError> {
    let trip_id = path.into_inner();

    let deletion = cancellation
        .delete_trip(trip_id, operator.company_id)
        .await?;

    info!(
        %trip_id,
        cancelled = deletion.cancelled_tickets,
        refunded = %deletion.refunded_total,
        "Trip deleted"
    );

    let message = if deletion.cancelled_tickets > 0 {
        format!(
            "Trip deleted successfully. {} booking(s) were cancelled and refunded.",
            deletion.cancelled_tickets
        )
    } else {
        "Trip deleted successfully.".to_string()
    };
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(deletion, message)))
}

/// Create a coupon valid on the operator's company trips
///
/// POST /api/v1/company/coupons
#[instrument(skip_all, fields(company_id = %operator.company_id))]
pub async fn create_coupon<S: BookingStore>(
    catalog: web::Data<CatalogService<S>>,
    operator: CompanyUser,
    req: web::Json<CouponCreateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Coupon creation validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let coupon = catalog
        .create_coupon(req.into_inner().into_new_coupon(operator.company_id))
        .await?;

    info!(coupon_id = %coupon.id, code = %coupon.code, "Coupon created");

    let message = format!("Coupon '{}' has been created successfully!", coupon.code);
    Ok(HttpResponse::Created().json(ApiResponse::with_message(coupon, message)))
}

/// Configure company operator routes
pub fn configure<S: BookingStore>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/company")
            .route("/tickets/{id}/cancel", web::post().to(cancel_booking::<S>))
            .route("/trips", web::post().to(create_trip::<S>))
            .route("/trips/{id}", web::delete().to(delete_trip::<S>))
            .route("/coupons", web::post().to(create_coupon::<S>)),
    );
}
