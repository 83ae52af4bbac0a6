//! Trip and coupon management plus the read-side booking views

use busline_core::{
    models::{Coupon, NewCoupon, NewTrip, SeatMap, TicketSummary, Trip},
    traits::{BookingStore, BookingTx},
    AppError, AppResult,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

pub struct CatalogService<S: BookingStore> {
    store: Arc<S>,
}

impl<S: BookingStore> CatalogService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create a trip for the company named in `new_trip`
    #[instrument(skip(self, new_trip), fields(company_id = %new_trip.company_id))]
    pub async fn create_trip(&self, new_trip: NewTrip) -> AppResult<Trip> {
        let trip = new_trip.into_trip(Utc::now())?;

        let mut tx = self.store.begin().await?;
        if tx.company_name(trip.company_id).await?.is_none() {
            return Err(AppError::NotFound(
                "Company information not found.".to_string(),
            ));
        }
        tx.insert_trip(&trip).await?;
        tx.commit().await?;

        info!(
            "Trip {} created: {} -> {} at {}",
            trip.id, trip.departure_city, trip.destination_city, trip.departure_time
        );
        Ok(trip)
    }

    /// Create a coupon; codes are unique within one company scope
    #[instrument(skip(self, new_coupon), fields(code = %new_coupon.code))]
    pub async fn create_coupon(&self, new_coupon: NewCoupon) -> AppResult<Coupon> {
        let coupon = new_coupon.into_coupon(Utc::now())?;

        let mut tx = self.store.begin().await?;
        if tx.coupon_code_exists(&coupon.code, coupon.company_id).await? {
            return Err(AppError::Validation(
                "A coupon with this code already exists in your company.".to_string(),
            ));
        }
        tx.insert_coupon(&coupon).await?;
        tx.commit().await?;

        info!("Coupon {} created ({}% off)", coupon.code, coupon.discount);
        Ok(coupon)
    }

    pub async fn seat_map(&self, trip_id: Uuid) -> AppResult<SeatMap> {
        self.store
            .seat_map(trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Trip not found.".to_string()))
    }

    /// A rider's tickets, newest first, with EXPIRED derived from the current time
    pub async fn tickets_for_rider(&self, rider_id: Uuid) -> AppResult<Vec<TicketSummary>> {
        let now = Utc::now();
        let tickets = self.store.tickets_for_rider(rider_id).await?;
        Ok(tickets.into_iter().map(|t| t.summarize(now)).collect())
    }
}
