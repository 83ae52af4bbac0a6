//! JWT token creation and validation service

use crate::claims::Claims;
use busline_core::error::AppError;
use busline_core::models::UserRole;
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// JWT Service for token creation and validation
#[derive(Clone)]
pub struct JwtService {
    /// Default token expiration time in seconds
    expiration_secs: i64,

    encoding_key: EncodingKey,

    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str, expiration_secs: i64) -> Self {
        Self {
            expiration_secs,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Sign `claims`, setting `exp` from the default lifetime when it is unset
    pub fn create_token(&self, claims: &Claims) -> Result<String, AppError> {
        let mut token_claims = claims.clone();

        if token_claims.exp == 0 {
            let exp = Utc::now() + Duration::seconds(self.expiration_secs);
            token_claims.exp = exp.timestamp();
        }

        debug!(
            user_id = %token_claims.sub,
            role = %token_claims.role,
            exp = %token_claims.exp,
            "Creating JWT token"
        );

        encode(&Header::default(), &token_claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, "Failed to create JWT token");
            AppError::Internal(format!("Token creation failed: {}", e))
        })
    }

    pub fn create_token_for_user(
        &self,
        user_id: Uuid,
        role: UserRole,
        company_id: Option<Uuid>,
    ) -> Result<String, AppError> {
        self.create_token(&Claims::new(user_id, role, company_id))
    }

    /// Validate a JWT token and extract claims
    ///
    /// # Errors
    ///
    /// - `AppError::TokenExpired` if the token has expired
    /// - `AppError::InvalidToken` if the signature or payload is invalid
    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => {
                    warn!("Token expired");
                    AppError::TokenExpired
                }
                _ => {
                    warn!(error = %e, "Invalid token");
                    AppError::InvalidToken(format!("Token validation failed: {}", e))
                }
            })?;

        let claims = token_data.claims;

        // jsonwebtoken allows a leeway on `exp`
        if claims.is_expired() {
            warn!(user_id = %claims.sub, "Token expired (manual check)");
            return Err(AppError::TokenExpired);
        }

        debug!(user_id = %claims.sub, role = %claims.role, "Token validated");
        Ok(claims)
    }

    pub fn expiration_secs(&self) -> i64 {
        self.expiration_secs
    }
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("expiration_secs", &self.expiration_secs)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
