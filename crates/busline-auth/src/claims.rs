//! JWT Claims structure

use busline_core::{models::UserRole, AppError, AppResult};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// User role
    pub role: UserRole,

    /// Company an operator acts for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Claims for a user; `exp` is filled in by [`JwtService`](crate::JwtService)
    pub fn new(user_id: Uuid, role: UserRole, company_id: Option<Uuid>) -> Self {
        Self {
            sub: user_id.to_string(),
            role,
            company_id,
            iat: Utc::now().timestamp(),
            exp: 0,
        }
    }

    pub fn with_expiration(
        user_id: Uuid,
        role: UserRole,
        company_id: Option<Uuid>,
        expires_in_secs: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            role,
            company_id,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(expires_in_secs)).timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }

    /// The subject as a user id
    pub fn user_id(&self) -> AppResult<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::InvalidToken("Subject is not a user id".to_string()))
    }
}
