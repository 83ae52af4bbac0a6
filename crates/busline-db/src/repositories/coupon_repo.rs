//! Coupon and redemption queries

use busline_core::{
    models::{Coupon, CouponRedemption},
    AppError, AppResult,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::{debug, error, instrument};
use uuid::Uuid;

const COUPON_COLUMNS: &str = "id, code, discount, company_id, usage_limit, expire_date, created_at";

/// All coupons sharing a code, locked so their usage count cannot move under us
#[instrument(skip(conn))]
pub(crate) async fn lock_by_code(conn: &mut PgConnection, code: &str) -> AppResult<Vec<Coupon>> {
    debug!("Locking coupons with code {}", code);

    let rows = sqlx::query_as::<sqlx::Postgres, CouponRow>(&format!(
        "SELECT {} FROM coupons WHERE code = $1 ORDER BY created_at, id FOR UPDATE",
        COUPON_COLUMNS
    ))
    .bind(code)
    .fetch_all(conn)
    .await
    .map_err(|e| {
        error!("Database error locking coupon {}: {}", code, e);
        AppError::Database(format!("Failed to lock coupon: {}", e))
    })?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// All coupons sharing a code, read without row locks
#[instrument(skip(conn))]
pub(crate) async fn find_by_code(conn: &mut PgConnection, code: &str) -> AppResult<Vec<Coupon>> {
    let rows = sqlx::query_as::<sqlx::Postgres, CouponRow>(&format!(
        "SELECT {} FROM coupons WHERE code = $1 ORDER BY created_at, id",
        COUPON_COLUMNS
    ))
    .bind(code)
    .fetch_all(conn)
    .await
    .map_err(|e| {
        error!("Database error finding coupon {}: {}", code, e);
        AppError::Database(format!("Failed to find coupon: {}", e))
    })?;

    Ok(rows.into_iter().map(Into::into).collect())
}

#[instrument(skip(conn))]
pub(crate) async fn code_exists(
    conn: &mut PgConnection,
    code: &str,
    company_id: Option<Uuid>,
) -> AppResult<bool> {
    sqlx::query_scalar::<sqlx::Postgres, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM coupons
            WHERE code = $1 AND company_id IS NOT DISTINCT FROM $2
        )
        "#,
    )
    .bind(code)
    .bind(company_id)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        error!("Database error checking coupon code {}: {}", code, e);
        AppError::Database(format!("Failed to check coupon code: {}", e))
    })
}

#[instrument(skip(conn, coupon), fields(code = %coupon.code))]
pub(crate) async fn insert_coupon(conn: &mut PgConnection, coupon: &Coupon) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO coupons (id, code, discount, company_id, usage_limit, expire_date, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(coupon.id)
    .bind(&coupon.code)
    .bind(coupon.discount)
    .bind(coupon.company_id)
    .bind(coupon.usage_limit)
    .bind(coupon.expire_date)
    .bind(coupon.created_at)
    .execute(conn)
    .await
    .map_err(|e| {
        error!("Database error creating coupon: {}", e);
        AppError::Database(format!("Failed to create coupon: {}", e))
    })?;

    Ok(())
}

#[instrument(skip(conn))]
pub(crate) async fn redemption_count(conn: &mut PgConnection, coupon_id: Uuid) -> AppResult<i64> {
    sqlx::query_scalar::<sqlx::Postgres, i64>(
        "SELECT COUNT(*) FROM coupon_redemptions WHERE coupon_id = $1",
    )
    .bind(coupon_id)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        error!("Database error counting redemptions of {}: {}", coupon_id, e);
        AppError::Database(format!("Failed to count coupon redemptions: {}", e))
    })
}

#[instrument(skip(conn))]
pub(crate) async fn has_redeemed(
    conn: &mut PgConnection,
    coupon_id: Uuid,
    rider_id: Uuid,
) -> AppResult<bool> {
    sqlx::query_scalar::<sqlx::Postgres, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM coupon_redemptions WHERE coupon_id = $1 AND user_id = $2
        )
        "#,
    )
    .bind(coupon_id)
    .bind(rider_id)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        error!("Database error checking redemption of {}: {}", coupon_id, e);
        AppError::Database(format!("Failed to check coupon redemption: {}", e))
    })
}

#[instrument(skip(conn, redemption), fields(coupon_id = %redemption.coupon_id))]
pub(crate) async fn insert_redemption(
    conn: &mut PgConnection,
    redemption: &CouponRedemption,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO coupon_redemptions (id, coupon_id, user_id, created_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(redemption.id)
    .bind(redemption.coupon_id)
    .bind(redemption.rider_id)
    .bind(redemption.created_at)
    .execute(conn)
    .await
    .map_err(|e| {
        error!("Database error recording redemption: {}", e);
        AppError::Database(format!("Failed to record coupon redemption: {}", e))
    })?;

    Ok(())
}

/// Database row for coupons
#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: Uuid,
    code: String,
    discount: Decimal,
    company_id: Option<Uuid>,
    usage_limit: i32,
    expire_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<CouponRow> for Coupon {
    fn from(row: CouponRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            discount: row.discount,
            company_id: row.company_id,
            usage_limit: row.usage_limit,
            expire_date: row.expire_date,
            created_at: row.created_at,
        }
    }
}
