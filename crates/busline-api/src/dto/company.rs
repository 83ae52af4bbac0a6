//! Company operator DTOs
//!
//! Request types for trip and coupon management. The operator's company always
//! comes from the token, never from the body.

use busline_core::models::{BusType, NewCoupon, NewTrip};
use busline_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Trip creation request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TripCreateRequest {
    #[validate(length(min = 1, max = 100, message = "All fields are required."))]
    pub departure_city: String,

    #[validate(length(min = 1, max = 100, message = "All fields are required."))]
    pub destination_city: String,

    pub departure_time: DateTime<Utc>,

    pub arrival_time: DateTime<Utc>,

    /// Seat layout, "2+2" or "2+1"
    pub bus_type: String,

    pub price: Decimal,
}

impl TripCreateRequest {
    pub fn into_new_trip(self, company_id: Uuid) -> AppResult<NewTrip> {
        let bus_type = BusType::from_str(&self.bus_type)
            .ok_or_else(|| AppError::Validation("Invalid bus type.".to_string()))?;

        Ok(NewTrip {
            company_id,
            departure_city: self.departure_city,
            destination_city: self.destination_city,
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            bus_type,
            price: self.price,
        })
    }
}

/// Coupon creation request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CouponCreateRequest {
    #[validate(length(min = 1, max = 20, message = "Coupon code must be 1-20 letters or digits."))]
    pub code: String,

    /// Percentage off
    pub discount: Decimal,

    #[validate(range(min = 1, message = "Usage limit must be at least 1."))]
    pub usage_limit: i32,

    pub expire_date: DateTime<Utc>,
}

impl CouponCreateRequest {
    pub fn into_new_coupon(self, company_id: Uuid) -> NewCoupon {
        NewCoupon {
            code: self.code,
            discount: self.discount,
            company_id: Some(company_id),
            usage_limit: self.usage_limit,
            expire_date: self.expire_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn trip_request(bus_type: &str) -> TripCreateRequest {
        let departure = Utc::now() + Duration::days(2);
        TripCreateRequest {
            departure_city: "Izmir".to_string(),
            destination_city: "Ankara".to_string(),
            departure_time: departure,
            arrival_time: departure + Duration::hours(8),
            bus_type: bus_type.to_string(),
            price: dec!(450),
        }
    }

    #[test]
    fn test_trip_request_conversion() {
        let company = Uuid::new_v4();
        let new_trip = trip_request("2+1").into_new_trip(company).unwrap();
        assert_eq!(new_trip.company_id, company);
        assert_eq!(new_trip.bus_type, BusType::TwoPlusOne);

        let err = trip_request("double-decker").into_new_trip(company).unwrap_err();
        assert_eq!(err.to_string(), "Invalid bus type.");
    }

    #[test]
    fn test_trip_request_validation() {
        let mut req = trip_request("2+2");
        assert!(req.validate().is_ok());

        req.departure_city = String::new();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_coupon_request_validation() {
        let mut req = CouponCreateRequest {
            code: "SUMMER25".to_string(),
            discount: dec!(25),
            usage_limit: 100,
            expire_date: Utc::now() + Duration::days(30),
        };
        assert!(req.validate().is_ok());

        req.usage_limit = 0;
        assert!(req.validate().is_err());

        req.usage_limit = 1;
        req.code = "A".repeat(21);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_coupon_scoped_to_operator_company() {
        let company = Uuid::new_v4();
        let new_coupon = CouponCreateRequest {
            code: "spring10".to_string(),
            discount: dec!(10),
            usage_limit: 5,
            expire_date: Utc::now() + Duration::days(7),
        }
        .into_new_coupon(company);

        assert_eq!(new_coupon.company_id, Some(company));
    }
}
