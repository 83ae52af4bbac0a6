//! Public trip handlers

use crate::dto::ApiResponse;
use actix_web::{web, HttpResponse};
use busline_core::traits::BookingStore;
use busline_core::AppError;
use busline_services::CatalogService;
use tracing::instrument;
use uuid::Uuid;

/// Occupied seats of a trip
///
/// GET /api/v1/trips/{id}/seats
#[instrument(skip(catalog))]
pub async fn get_seats<S: BookingStore>(
    catalog: web::Data<CatalogService<S>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let seat_map = catalog.seat_map(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(seat_map)))
}

/// Configure trip routes
pub fn configure<S: BookingStore>(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/trips").route("/{id}/seats", web::get().to(get_seats::<S>)));
}
