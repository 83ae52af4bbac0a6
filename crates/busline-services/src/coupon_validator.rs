//! Coupon validation
//!
//! A coupon is checked in a fixed order: expiry, global usage cap, earlier
//! use by the same rider, company scope. The first failing check decides the
//! error. Validation has no side effects; the redemption is recorded by the
//! booking that applies the coupon.

use crate::fare;
use busline_core::{
    models::{normalize_code, Coupon, Discount},
    traits::BookingTx,
    AppError, AppResult,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// How a coupon's company relates to the companies running a booking's trips
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanyScope {
    Applies,
    /// The trips belong to more than one company
    MixedCompanies,
    /// The coupon belongs to this other company
    OtherCompany(Uuid),
}

/// Normalized coupon code, or `InvalidCoupon`
pub fn normalize(raw: &str) -> AppResult<String> {
    normalize_code(raw).ok_or(AppError::InvalidCoupon)
}

/// Distinct company ids in first-seen order
pub fn distinct_companies(company_ids: &[Uuid]) -> Vec<Uuid> {
    let mut distinct = Vec::with_capacity(company_ids.len());
    for id in company_ids {
        if !distinct.contains(id) {
            distinct.push(*id);
        }
    }
    distinct
}

/// Pick the coupon a booking refers to among those sharing a code:
/// the booking company's own coupon, then a global one, then any other.
pub fn select<'a>(candidates: &'a [Coupon], company_ids: &[Uuid]) -> Option<&'a Coupon> {
    let own = match company_ids {
        [only] => candidates.iter().find(|c| c.company_id == Some(*only)),
        _ => None,
    };
    own.or_else(|| candidates.iter().find(|c| c.is_global()))
        .or_else(|| candidates.first())
}

/// Usage checks, in order: expiry, usage cap, earlier use by this rider
pub fn check_usage(
    coupon: &Coupon,
    now: DateTime<Utc>,
    redemptions: i64,
    already_used: bool,
) -> AppResult<()> {
    if coupon.is_expired(now) {
        return Err(AppError::CouponExpired);
    }
    if redemptions >= i64::from(coupon.usage_limit) {
        return Err(AppError::CouponUsageLimitReached);
    }
    if already_used {
        return Err(AppError::CouponAlreadyUsed);
    }
    Ok(())
}

pub fn company_scope(coupon: &Coupon, company_ids: &[Uuid]) -> CompanyScope {
    let distinct = distinct_companies(company_ids);
    if distinct.len() > 1 {
        return CompanyScope::MixedCompanies;
    }
    match (coupon.company_id, distinct.first()) {
        (Some(owner), Some(trip_company)) if owner != *trip_company => {
            CompanyScope::OtherCompany(owner)
        }
        _ => CompanyScope::Applies,
    }
}

/// Validate `code` for a rider's booking over trips run by `company_ids`
/// and compute its discount on `subtotal`.
///
/// Coupon rows with this code stay locked until `tx` ends, so concurrent
/// bookings cannot both take the last use.
#[instrument(skip(tx, company_ids))]
pub async fn validate<T: BookingTx>(
    tx: &mut T,
    code: &str,
    rider_id: Uuid,
    company_ids: &[Uuid],
    subtotal: Decimal,
    now: DateTime<Utc>,
) -> AppResult<Discount> {
    let code = normalize(code)?;
    let candidates = tx.lock_coupons_by_code(&code).await?;
    evaluate(tx, code, &candidates, rider_id, company_ids, subtotal, now).await
}

/// Same checks as [`validate`] without locking the coupon rows.
///
/// For previews only: the result may be stale by the time a booking runs.
#[instrument(skip(tx, company_ids))]
pub async fn check<T: BookingTx>(
    tx: &mut T,
    code: &str,
    rider_id: Uuid,
    company_ids: &[Uuid],
    subtotal: Decimal,
    now: DateTime<Utc>,
) -> AppResult<Discount> {
    let code = normalize(code)?;
    let candidates = tx.find_coupons_by_code(&code).await?;
    evaluate(tx, code, &candidates, rider_id, company_ids, subtotal, now).await
}

async fn evaluate<T: BookingTx>(
    tx: &mut T,
    code: String,
    candidates: &[Coupon],
    rider_id: Uuid,
    company_ids: &[Uuid],
    subtotal: Decimal,
    now: DateTime<Utc>,
) -> AppResult<Discount> {
    let distinct = distinct_companies(company_ids);

    let coupon = select(candidates, &distinct).ok_or_else(|| {
        debug!("Unknown coupon code {}", code);
        AppError::InvalidCoupon
    })?;

    let redemptions = tx.redemption_count(coupon.id).await?;
    let already_used = tx.has_redeemed(coupon.id, rider_id).await?;
    check_usage(coupon, now, redemptions, already_used).map_err(|e| {
        warn!("Coupon {} rejected for rider {}: {}", code, rider_id, e);
        e
    })?;

    match company_scope(coupon, &distinct) {
        CompanyScope::Applies => {}
        CompanyScope::MixedCompanies => {
            return Err(AppError::CouponCompanyMismatch(
                "Cannot apply coupon to trips from different companies.".to_string(),
            ));
        }
        CompanyScope::OtherCompany(owner) => {
            let name = tx
                .company_name(owner)
                .await?
                .unwrap_or_else(|| "a different company".to_string());
            return Err(AppError::CouponCompanyMismatch(format!(
                "This coupon is only valid for {} trips.",
                name
            )));
        }
    }

    let amount = fare::coupon_discount(subtotal, coupon.discount);
    debug!("Coupon {} gives {} off {}", code, amount, subtotal);

    Ok(Discount {
        coupon_id: coupon.id,
        code,
        percentage: coupon.discount,
        amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use busline_core::{models::CouponRedemption, traits::BookingStore};
    use busline_db::MemoryBookingStore;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn coupon(code: &str, company_id: Option<Uuid>, usage_limit: i32) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: Uuid::new_v4(),
            code: code.to_string(),
            discount: dec!(20),
            company_id,
            usage_limit,
            expire_date: now + Duration::days(10),
            created_at: now,
        }
    }

    #[test]
    fn test_check_usage_order() {
        let now = Utc::now();
        let mut c = coupon("SAVE20", None, 1);

        // Every check fails; expiry is reported first
        c.expire_date = now - Duration::days(1);
        assert!(matches!(
            check_usage(&c, now, 1, true),
            Err(AppError::CouponExpired)
        ));

        c.expire_date = now + Duration::days(1);
        assert!(matches!(
            check_usage(&c, now, 1, true),
            Err(AppError::CouponUsageLimitReached)
        ));

        c.usage_limit = 5;
        assert!(matches!(
            check_usage(&c, now, 1, true),
            Err(AppError::CouponAlreadyUsed)
        ));
        assert!(check_usage(&c, now, 4, false).is_ok());
    }

    #[test]
    fn test_company_scope() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let global = coupon("ALL10", None, 5);
        assert_eq!(company_scope(&global, &[a]), CompanyScope::Applies);
        assert_eq!(company_scope(&global, &[a, b]), CompanyScope::MixedCompanies);

        let owned = coupon("ONLYA", Some(a), 5);
        assert_eq!(company_scope(&owned, &[a, a]), CompanyScope::Applies);
        assert_eq!(company_scope(&owned, &[b]), CompanyScope::OtherCompany(a));
    }

    #[test]
    fn test_select_prefers_own_then_global() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let other = coupon("SAVE", Some(b), 5);
        let global = coupon("SAVE", None, 5);
        let own = coupon("SAVE", Some(a), 5);

        let candidates = vec![other.clone(), global.clone(), own.clone()];
        assert_eq!(select(&candidates, &[a]).unwrap().id, own.id);

        let candidates = vec![other.clone(), global.clone()];
        assert_eq!(select(&candidates, &[a]).unwrap().id, global.id);

        let candidates = vec![other.clone()];
        assert_eq!(select(&candidates, &[a]).unwrap().id, other.id);
        assert!(select(&[], &[a]).is_none());
    }

    #[tokio::test]
    async fn test_validate_computes_discount() {
        let store = MemoryBookingStore::new();
        let company = store.add_company("Metro Turizm").await;
        let rider = store.add_rider(dec!(100)).await;
        store.add_coupon(coupon("SAVE20", Some(company), 10)).await;

        let mut tx = store.begin().await.unwrap();
        let discount = validate(&mut tx, " save20 ", rider, &[company], dec!(100), Utc::now())
            .await
            .unwrap();
        assert_eq!(discount.code, "SAVE20");
        assert_eq!(discount.amount, dec!(20));
        assert_eq!(discount.percentage, dec!(20));
    }

    #[tokio::test]
    async fn test_check_matches_validate() {
        let store = MemoryBookingStore::new();
        let company = store.add_company("Metro Turizm").await;
        let rider = store.add_rider(dec!(100)).await;
        let id = store.add_coupon(coupon("SAVE20", Some(company), 1)).await;
        let now = Utc::now();

        let mut tx = store.begin().await.unwrap();
        let peeked = check(&mut tx, "save20", rider, &[company], dec!(45.50), now)
            .await
            .unwrap();
        let locked = validate(&mut tx, "save20", rider, &[company], dec!(45.50), now)
            .await
            .unwrap();
        assert_eq!(peeked, locked);
        assert_eq!(peeked.coupon_id, id);
        assert_eq!(peeked.amount, dec!(9.10));

        tx.insert_redemption(&CouponRedemption::new(id, Uuid::new_v4()))
            .await
            .unwrap();
        assert!(matches!(
            check(&mut tx, "SAVE20", rider, &[company], dec!(45.50), now).await,
            Err(AppError::CouponUsageLimitReached)
        ));
    }

    #[tokio::test]
    async fn test_validate_failures() {
        let store = MemoryBookingStore::new();
        let company = store.add_company("Metro Turizm").await;
        let other = store.add_company("Pamukkale").await;
        let rider = store.add_rider(dec!(100)).await;
        let owned = store.add_coupon(coupon("METRO15", Some(company), 10)).await;
        let now = Utc::now();

        let mut tx = store.begin().await.unwrap();
        assert!(matches!(
            validate(&mut tx, "NOPE", rider, &[company], dec!(100), now).await,
            Err(AppError::InvalidCoupon)
        ));
        assert!(matches!(
            validate(&mut tx, "bad-code!", rider, &[company], dec!(100), now).await,
            Err(AppError::InvalidCoupon)
        ));

        let err = validate(&mut tx, "METRO15", rider, &[other], dec!(100), now)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "This coupon is only valid for Metro Turizm trips.");

        let err = validate(&mut tx, "METRO15", rider, &[company, other], dec!(100), now)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot apply coupon to trips from different companies."
        );

        tx.insert_redemption(&CouponRedemption::new(owned, rider))
            .await
            .unwrap();
        assert!(matches!(
            validate(&mut tx, "METRO15", rider, &[company], dec!(100), now).await,
            Err(AppError::CouponAlreadyUsed)
        ));
    }
}
