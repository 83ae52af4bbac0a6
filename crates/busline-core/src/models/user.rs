//! User and company models
//!
//! Riders hold the spendable balance; company operators act on behalf of the
//! bus company they belong to.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// User role enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Rider buying tickets
    #[default]
    User,
    /// Bus company operator
    Company,
    /// Platform administrator
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::User => write!(f, "user"),
            UserRole::Company => write!(f, "company"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl UserRole {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(UserRole::User),
            "company" => Some(UserRole::Company),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }

    /// Riders are the only role that books and holds a balance
    pub fn is_rider(&self) -> bool {
        matches!(self, UserRole::User)
    }

    pub fn is_company(&self) -> bool {
        matches!(self, UserRole::Company)
    }
}

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
    /// Company the operator works for
    pub company_id: Option<Uuid>,
    /// Spendable balance, never negative
    pub balance: Decimal,
    /// Only used to colour occupied seats on the seat map
    pub gender: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Bus company
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
