//! Balance transaction models
//!
//! Every change to a rider's balance leaves an immutable audit entry written
//! in the same database transaction as the change itself.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Funds added by the rider
    Deposit,
    /// Payment for a booking
    BookingDebit,
    /// Ticket price returned after a cancellation
    Refund,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Deposit => write!(f, "deposit"),
            TransactionType::BookingDebit => write!(f, "booking_debit"),
            TransactionType::Refund => write!(f, "refund"),
        }
    }
}

impl TransactionType {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "deposit" => Some(TransactionType::Deposit),
            "booking_debit" => Some(TransactionType::BookingDebit),
            "refund" => Some(TransactionType::Refund),
            _ => None,
        }
    }
}

/// Balance transaction entity
///
/// Immutable audit log of all balance changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceTransaction {
    /// Unique identifier
    pub id: Uuid,

    /// Rider whose balance changed
    pub rider_id: Uuid,

    /// Transaction amount (positive or negative)
    pub amount: Decimal,

    /// Balance before transaction
    pub previous_balance: Decimal,

    /// Balance after transaction
    pub new_balance: Decimal,

    /// Type of transaction
    pub transaction_type: TransactionType,

    /// Ticket ids or payment method the change relates to
    pub reference: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl BalanceTransaction {
    /// Create a new transaction record
    pub fn new(
        rider_id: Uuid,
        amount: Decimal,
        previous_balance: Decimal,
        transaction_type: TransactionType,
        reference: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            rider_id,
            amount,
            previous_balance,
            new_balance: previous_balance + amount,
            transaction_type,
            reference,
            created_at: Utc::now(),
        }
    }

    /// Check if this is a debit transaction (reduces balance)
    pub fn is_debit(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Check if this is a credit transaction (increases balance)
    pub fn is_credit(&self) -> bool {
        self.amount > Decimal::ZERO
    }
}

/// Accepted "add funds" payment methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    Paypal,
    BankTransfer,
    Crypto,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::CreditCard => write!(f, "credit_card"),
            PaymentMethod::Paypal => write!(f, "paypal"),
            PaymentMethod::BankTransfer => write!(f, "bank_transfer"),
            PaymentMethod::Crypto => write!(f, "crypto"),
        }
    }
}

impl PaymentMethod {
    /// Parse from the request label
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "credit_card" => Some(PaymentMethod::CreditCard),
            "paypal" => Some(PaymentMethod::Paypal),
            "bank_transfer" => Some(PaymentMethod::BankTransfer),
            "crypto" => Some(PaymentMethod::Crypto),
            _ => None,
        }
    }
}

/// Outcome of an "add funds" call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub amount_added: Decimal,
    pub previous_balance: Decimal,
    pub new_balance: Decimal,
    pub payment_method: PaymentMethod,
    pub timestamp: DateTime<Utc>,
}
