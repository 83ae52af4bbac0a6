//! Balance ledger
//!
//! `debit` and `credit` run inside the caller's transaction and never commit
//! on their own. Every non-zero change appends a [`BalanceTransaction`] in
//! that same transaction. `BalanceService::deposit` is the one balance
//! operation with its own transaction.

use busline_core::{
    config::BookingConfig,
    models::{BalanceTransaction, DepositReceipt, PaymentMethod, TransactionType},
    traits::{BookingStore, BookingTx},
    AppError, AppResult,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

fn check_amount(amount: Decimal) -> AppResult<()> {
    if amount < Decimal::ZERO {
        return Err(AppError::Validation(
            "Amount cannot be negative.".to_string(),
        ));
    }
    Ok(())
}

async fn locked_balance<T: BookingTx>(tx: &mut T, rider_id: Uuid) -> AppResult<Decimal> {
    tx.lock_balance(rider_id)
        .await?
        .ok_or_else(|| AppError::RiderNotFound(rider_id.to_string()))
}

async fn apply<T: BookingTx>(
    tx: &mut T,
    rider_id: Uuid,
    current: Decimal,
    change: Decimal,
    kind: TransactionType,
    reference: Option<String>,
) -> AppResult<Decimal> {
    let entry = BalanceTransaction::new(rider_id, change, current, kind, reference);
    tx.set_balance(rider_id, entry.new_balance).await?;
    tx.record_balance_transaction(&entry).await?;
    Ok(entry.new_balance)
}

/// Take `amount` from the rider's balance; returns the new balance.
///
/// Fails with `InsufficientBalance` before any write if the balance is short.
#[instrument(skip(tx, reference))]
pub async fn debit<T: BookingTx>(
    tx: &mut T,
    rider_id: Uuid,
    amount: Decimal,
    kind: TransactionType,
    reference: Option<String>,
) -> AppResult<Decimal> {
    check_amount(amount)?;
    let current = locked_balance(tx, rider_id).await?;

    if current < amount {
        warn!(
            "Insufficient balance for rider {}: required {}, available {}",
            rider_id, amount, current
        );
        return Err(AppError::InsufficientBalance {
            required: amount.to_string(),
            available: current.to_string(),
        });
    }
    if amount.is_zero() {
        return Ok(current);
    }

    apply(tx, rider_id, current, -amount, kind, reference).await
}

/// Add `amount` to the rider's balance; returns the new balance
#[instrument(skip(tx, reference))]
pub async fn credit<T: BookingTx>(
    tx: &mut T,
    rider_id: Uuid,
    amount: Decimal,
    kind: TransactionType,
    reference: Option<String>,
) -> AppResult<Decimal> {
    check_amount(amount)?;
    let current = locked_balance(tx, rider_id).await?;

    if amount.is_zero() {
        return Ok(current);
    }

    apply(tx, rider_id, current, amount, kind, reference).await
}

/// Rider-facing balance operations
pub struct BalanceService<S: BookingStore> {
    store: Arc<S>,
    min_deposit: Decimal,
    max_deposit: Decimal,
}

impl<S: BookingStore> BalanceService<S> {
    pub fn new(store: Arc<S>, config: &BookingConfig) -> Self {
        Self {
            store,
            min_deposit: config.min_deposit,
            max_deposit: config.max_deposit,
        }
    }

    /// Add funds through a trusted payment call
    #[instrument(skip(self))]
    pub async fn deposit(
        &self,
        rider_id: Uuid,
        amount: Decimal,
        payment_method: PaymentMethod,
    ) -> AppResult<DepositReceipt> {
        if amount < self.min_deposit {
            return Err(AppError::Validation(format!(
                "Minimum amount is ${:.2}",
                self.min_deposit
            )));
        }
        if amount > self.max_deposit {
            return Err(AppError::Validation(format!(
                "Maximum amount is ${:.2}",
                self.max_deposit
            )));
        }

        let mut tx = self.store.begin().await?;
        let previous_balance = locked_balance(&mut tx, rider_id).await?;
        let new_balance = credit(
            &mut tx,
            rider_id,
            amount,
            TransactionType::Deposit,
            Some(payment_method.to_string()),
        )
        .await?;
        tx.commit().await?;

        info!(
            "Rider {} added {} via {}, balance {} -> {}",
            rider_id, amount, payment_method, previous_balance, new_balance
        );

        Ok(DepositReceipt {
            amount_added: amount,
            previous_balance,
            new_balance,
            payment_method,
            timestamp: Utc::now(),
        })
    }
}
