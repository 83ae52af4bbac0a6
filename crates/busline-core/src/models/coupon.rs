//! Coupon and redemption models

use crate::error::AppError;
use crate::AppResult;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest accepted coupon code
pub const MAX_COUPON_CODE_LEN: usize = 20;

/// Normalize a coupon code: trimmed, uppercased, ASCII alphanumeric, at most 20 chars.
///
/// Returns `None` when the code cannot be a valid coupon code.
pub fn normalize_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_uppercase();
    let valid = !code.is_empty()
        && code.len() <= MAX_COUPON_CODE_LEN
        && code.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(code)
}

/// Percentage discount coupon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    /// Discount percentage, e.g. 20 for 20%
    pub discount: Decimal,
    /// Owning company; `None` makes the coupon valid for every company
    pub company_id: Option<Uuid>,
    pub usage_limit: i32,
    pub expire_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_date <= now
    }

    pub fn is_global(&self) -> bool {
        self.company_id.is_none()
    }
}

/// Record of a rider having used a coupon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponRedemption {
    pub id: Uuid,
    pub coupon_id: Uuid,
    pub rider_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl CouponRedemption {
    pub fn new(coupon_id: Uuid, rider_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            coupon_id,
            rider_id,
            created_at: Utc::now(),
        }
    }
}

/// Coupon creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCoupon {
    pub code: String,
    pub discount: Decimal,
    pub company_id: Option<Uuid>,
    pub usage_limit: i32,
    pub expire_date: DateTime<Utc>,
}

impl NewCoupon {
    /// Validate creation rules and build the coupon with its normalized code
    pub fn into_coupon(self, now: DateTime<Utc>) -> AppResult<Coupon> {
        let code = normalize_code(&self.code).ok_or_else(|| {
            AppError::Validation(
                "Coupon code must be 1-20 letters or digits.".to_string(),
            )
        })?;

        if self.discount <= Decimal::ZERO || self.discount > Decimal::ONE_HUNDRED {
            return Err(AppError::Validation(
                "Discount must be between 0 and 100 percent.".to_string(),
            ));
        }
        if self.usage_limit < 1 {
            return Err(AppError::Validation(
                "Usage limit must be at least 1.".to_string(),
            ));
        }
        if self.expire_date <= now {
            return Err(AppError::Validation(
                "Expiry date must be in the future.".to_string(),
            ));
        }

        Ok(Coupon {
            id: Uuid::new_v4(),
            code,
            discount: self.discount,
            company_id: self.company_id,
            usage_limit: self.usage_limit,
            expire_date: self.expire_date,
            created_at: now,
        })
    }
}
