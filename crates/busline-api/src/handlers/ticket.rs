//! Rider ticket handlers

use crate::dto::ApiResponse;
use actix_web::{web, HttpResponse};
use busline_auth::RiderUser;
use busline_core::traits::BookingStore;
use busline_core::AppError;
use busline_services::{CancellationFlow, CatalogService};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// List the rider's tickets, newest first
///
/// GET /api/v1/tickets
#[instrument(skip_all, fields(rider_id = %rider.user_id))]
pub async fn list_tickets<S: BookingStore>(
    catalog: web::Data<CatalogService<S>>,
    rider: RiderUser,
) -> Result<HttpResponse, AppError> {
    let tickets = catalog.tickets_for_rider(rider.user_id).await?;
    debug!(count = tickets.len(), "Listed tickets");

    Ok(HttpResponse::Ok().json(ApiResponse::success(tickets)))
}

/// Cancel one of the rider's own tickets and refund it
///
/// POST /api/v1/tickets/{id}/cancel
#[instrument(skip_all, fields(rider_id = %rider.user_id))]
pub async fn cancel_ticket<S: BookingStore>(
    cancellation: web::Data<CancellationFlow<S>>,
    path: web::Path<Uuid>,
    rider: RiderUser,
) -> Result<HttpResponse, AppError> {
    let ticket_id = path.into_inner();

    let result = cancellation.cancel(ticket_id, rider.requester()).await?;

    info!(%ticket_id, refund = %result.refund_amount, "Ticket cancelled by rider");

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        result,
        "Ticket cancelled successfully. Refund has been added to your balance.",
    )))
}

/// Configure ticket routes
pub fn configure<S: BookingStore>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tickets")
            .route("", web::get().to(list_tickets::<S>))
            .route("/{id}/cancel", web::post().to(cancel_ticket::<S>)),
    );
}
