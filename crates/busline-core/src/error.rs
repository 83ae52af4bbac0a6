//! Unified error handling for Busline
//!
//! Every failure the booking engine can produce is a variant of [`AppError`].
//! Business-rule variants carry the exact message shown to the rider; the
//! infrastructure variants are logged and replaced by a generic message
//! before they reach the client.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Message returned to clients for any infrastructure failure
pub const GENERIC_FAILURE_MESSAGE: &str = "A database error occurred. Please try again later.";

/// Main application error type
///
/// All errors in the application should be converted to this type.
/// It implements `ResponseError` for automatic HTTP response generation.
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Database Errors ====================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    // ==================== Authentication Errors ====================
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: insufficient permissions")]
    Forbidden,

    // ==================== Booking Errors ====================
    #[error("Trip not found.")]
    TripNotFound(String),

    #[error("Ticket not found.")]
    TicketNotFound(String),

    #[error("Rider account not found.")]
    RiderNotFound(String),

    #[error("{0}")]
    InvalidSeat(String),

    #[error("Seat {seat} is no longer available. Please select different seats.")]
    SeatConflict { seat: i32 },

    #[error("Not enough seats available on this trip.")]
    CapacityExceeded,

    #[error("Insufficient balance. Please add funds to your account.")]
    InsufficientBalance { required: String, available: String },

    // ==================== Coupon Errors ====================
    #[error("Invalid or expired coupon code.")]
    InvalidCoupon,

    #[error("Coupon has expired.")]
    CouponExpired,

    #[error("Coupon usage limit reached.")]
    CouponUsageLimitReached,

    #[error("You have already used this coupon.")]
    CouponAlreadyUsed,

    #[error("{0}")]
    CouponCompanyMismatch(String),

    // ==================== Cancellation Errors ====================
    #[error("{0}")]
    PermissionDenied(String),

    #[error("This ticket has already been cancelled.")]
    AlreadyCancelled,

    #[error("Cannot cancel ticket within 1 hour of departure time.")]
    CancellationWindowClosed,

    // ==================== Validation Errors ====================
    #[error("{0}")]
    Validation(String),

    // ==================== Resource Errors ====================
    #[error("{0}")]
    NotFound(String),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request: validation and every booking business rule
            AppError::Validation(_)
            | AppError::TripNotFound(_)
            | AppError::TicketNotFound(_)
            | AppError::RiderNotFound(_)
            | AppError::InvalidSeat(_)
            | AppError::SeatConflict { .. }
            | AppError::CapacityExceeded
            | AppError::InsufficientBalance { .. }
            | AppError::InvalidCoupon
            | AppError::CouponExpired
            | AppError::CouponUsageLimitReached
            | AppError::CouponAlreadyUsed
            | AppError::CouponCompanyMismatch(_)
            | AppError::PermissionDenied(_)
            | AppError::AlreadyCancelled
            | AppError::CancellationWindowClosed => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::InvalidToken(_) | AppError::TokenExpired | AppError::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }

            // 403 Forbidden
            AppError::Forbidden => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::NotFound(_) => StatusCode::NOT_FOUND,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Transaction(_)
            | AppError::Internal(_)
            | AppError::Config(_)
            | AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Pool(_) => "pool_error",
            AppError::Transaction(_) => "transaction_error",
            AppError::TokenExpired => "token_expired",
            AppError::InvalidToken(_) => "invalid_token",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::TripNotFound(_) => "trip_not_found",
            AppError::TicketNotFound(_) => "ticket_not_found",
            AppError::RiderNotFound(_) => "rider_not_found",
            AppError::InvalidSeat(_) => "invalid_seat",
            AppError::SeatConflict { .. } => "seat_conflict",
            AppError::CapacityExceeded => "capacity_exceeded",
            AppError::InsufficientBalance { .. } => "insufficient_balance",
            AppError::InvalidCoupon => "invalid_coupon",
            AppError::CouponExpired => "coupon_expired",
            AppError::CouponUsageLimitReached => "coupon_usage_limit_reached",
            AppError::CouponAlreadyUsed => "coupon_already_used",
            AppError::CouponCompanyMismatch(_) => "coupon_company_mismatch",
            AppError::PermissionDenied(_) => "permission_denied",
            AppError::AlreadyCancelled => "already_cancelled",
            AppError::CancellationWindowClosed => "cancellation_window_closed",
            AppError::Validation(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
            AppError::Serialization(_) => "serialization_error",
        }
    }

    /// True for failures of the data store or the process itself
    pub fn is_infrastructure(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Message safe to show to the caller
    pub fn public_message(&self) -> String {
        if self.is_infrastructure() {
            GENERIC_FAILURE_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        AppError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if self.is_infrastructure() {
            error!(error = %self, code = self.error_code(), "Request failed");
        }

        let body = json!({
            "error": self.error_code(),
            "message": self.public_message(),
            "status": status.as_u16(),
        });

        HttpResponse::build(status).json(body)
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_errors_are_bad_requests() {
        assert_eq!(
            AppError::SeatConflict { seat: 4 }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InsufficientBalance {
                required: "80.00".to_string(),
                available: "20.00".to_string()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::CancellationWindowClosed.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("Trip not found.".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_infrastructure_errors_hide_details() {
        let err = AppError::Database("connection reset by peer".to_string());
        assert!(err.is_infrastructure());
        assert_eq!(err.public_message(), GENERIC_FAILURE_MESSAGE);

        let err = AppError::SeatConflict { seat: 12 };
        assert!(!err.is_infrastructure());
        assert_eq!(
            err.public_message(),
            "Seat 12 is no longer available. Please select different seats."
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::CouponAlreadyUsed.error_code(), "coupon_already_used");
        assert_eq!(AppError::CapacityExceeded.error_code(), "capacity_exceeded");
        assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_duplicate_coupon_is_a_validation_error() {
        let err = AppError::Validation(
            "A coupon with this code already exists in your company.".to_string(),
        );
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "validation_error");
        assert_eq!(
            err.public_message(),
            "A coupon with this code already exists in your company."
        );
    }

    #[test]
    fn test_no_business_rule_maps_to_conflict() {
        let errors = [
            AppError::SeatConflict { seat: 3 },
            AppError::CapacityExceeded,
            AppError::CouponUsageLimitReached,
            AppError::AlreadyCancelled,
            AppError::Validation("duplicate".to_string()),
            AppError::NotFound("missing".to_string()),
        ];
        for err in errors {
            assert_ne!(err.status_code(), StatusCode::CONFLICT, "{:?}", err);
        }
    }
}
