//! Rider balance queries
//!
//! The balance lives on the user row and is only ever changed while that row
//! is locked by the surrounding transaction.

use busline_core::{models::BalanceTransaction, AppError, AppResult};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::{debug, error, instrument};
use uuid::Uuid;

#[instrument(skip(conn))]
pub(crate) async fn lock_balance(conn: &mut PgConnection, rider_id: Uuid) -> AppResult<Option<Decimal>> {
    debug!("Locking balance of rider {}", rider_id);

    sqlx::query_scalar::<sqlx::Postgres, Decimal>(
        "SELECT balance FROM users WHERE id = $1 FOR UPDATE",
    )
    .bind(rider_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| {
        error!("Failed to lock balance of rider {}: {}", rider_id, e);
        AppError::Database(format!("Failed to lock balance: {}", e))
    })
}

#[instrument(skip(conn))]
pub(crate) async fn set_balance(
    conn: &mut PgConnection,
    rider_id: Uuid,
    balance: Decimal,
) -> AppResult<()> {
    sqlx::query("UPDATE users SET balance = $2 WHERE id = $1")
        .bind(rider_id)
        .bind(balance)
        .execute(conn)
        .await
        .map_err(|e| {
            error!("Failed to update balance of rider {}: {}", rider_id, e);
            AppError::Database(format!("Failed to update balance: {}", e))
        })?;

    Ok(())
}

#[instrument(skip(conn, entry), fields(rider_id = %entry.rider_id, kind = %entry.transaction_type))]
pub(crate) async fn record_transaction(
    conn: &mut PgConnection,
    entry: &BalanceTransaction,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO balance_transactions (
            id, user_id, amount, previous_balance, new_balance,
            transaction_type, reference, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(entry.id)
    .bind(entry.rider_id)
    .bind(entry.amount)
    .bind(entry.previous_balance)
    .bind(entry.new_balance)
    .bind(entry.transaction_type.to_string())
    .bind(&entry.reference)
    .bind(entry.created_at)
    .execute(conn)
    .await
    .map_err(|e| {
        error!("Failed to record balance transaction: {}", e);
        AppError::Database(format!("Failed to record balance transaction: {}", e))
    })?;

    Ok(())
}
