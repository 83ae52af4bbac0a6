//! Balance handlers

use crate::dto::{ApiResponse, DepositRequest};
use actix_web::{web, HttpResponse};
use busline_auth::RiderUser;
use busline_core::traits::BookingStore;
use busline_core::AppError;
use busline_services::BalanceService;
use tracing::{info, instrument};

/// Add funds to the rider's balance
///
/// POST /api/v1/balance/deposits
#[instrument(skip_all, fields(rider_id = %rider.user_id))]
pub async fn deposit<S: BookingStore>(
    balance: web::Data<BalanceService<S>>,
    rider: RiderUser,
    req: web::Json<DepositRequest>,
) -> Result<HttpResponse, AppError> {
    let payment_method = req.payment_method()?;

    let receipt = balance
        .deposit(rider.user_id, req.amount, payment_method)
        .await?;

    info!(amount = %receipt.amount_added, %payment_method, "Funds added");

    let message = format!(
        "Successfully added ${:.2} to your account!",
        receipt.amount_added
    );
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(receipt, message)))
}

/// Configure balance routes
pub fn configure<S: BookingStore>(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/balance").route("/deposits", web::post().to(deposit::<S>)));
}
