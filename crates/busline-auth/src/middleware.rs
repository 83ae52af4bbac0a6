//! Actix-web authentication extractors
//!
//! Provides extractors for authenticated callers with role checks.

use crate::jwt::JwtService;
use crate::Claims;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use busline_core::error::AppError;
use busline_core::models::{Requester, UserRole};
use futures::future::{ready, Ready};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Extract JWT token from request
///
/// Checks for token in the following order:
/// 1. Authorization header (Bearer token)
/// 2. Cookie named "token"
fn extract_token_from_request(req: &HttpRequest) -> Option<String> {
    if let Some(auth_header) = req.headers().get("Authorization") {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    if let Some(cookie) = req.cookie("token") {
        return Some(cookie.value().to_string());
    }

    None
}

/// Authenticated caller extractor
///
/// # Examples
///
/// ```no_run
/// use actix_web::HttpResponse;
/// use busline_auth::middleware::AuthenticatedUser;
///
/// async fn whoami(user: AuthenticatedUser) -> HttpResponse {
///     HttpResponse::Ok().json(serde_json::json!({
///         "user_id": user.user_id,
///         "role": user.role
///     }))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,

    pub role: UserRole,

    /// Company an operator acts for
    pub company_id: Option<Uuid>,

    /// Full claims from the JWT token
    pub claims: Claims,
}

impl AuthenticatedUser {
    fn from_claims(claims: Claims) -> Result<Self, AppError> {
        Ok(Self {
            user_id: claims.user_id()?,
            role: claims.role,
            company_id: claims.company_id,
            claims,
        })
    }

    fn authenticate(req: &HttpRequest) -> Result<Self, AppError> {
        let jwt_service = req
            .app_data::<web::Data<Arc<JwtService>>>()
            .map(|service| service.get_ref().clone())
            .ok_or_else(|| {
                warn!("JwtService not found in app data");
                AppError::Unauthorized("Authentication service not configured".to_string())
            })?;

        let token = extract_token_from_request(req).ok_or_else(|| {
            debug!("No authentication token found in request");
            AppError::Unauthorized("No authentication token provided".to_string())
        })?;

        let claims = jwt_service.validate_token(&token).map_err(|e| {
            warn!(error = %e, "Token validation failed");
            e
        })?;

        let user = Self::from_claims(claims)?;
        debug!(user_id = %user.user_id, role = %user.role, "User authenticated");
        Ok(user)
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::authenticate(req).map_err(actix_web::Error::from))
    }
}

/// Rider extractor
///
/// Only riders book, cancel their own tickets and top up a balance.
#[derive(Debug, Clone)]
pub struct RiderUser(pub AuthenticatedUser);

impl std::ops::Deref for RiderUser {
    type Target = AuthenticatedUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl RiderUser {
    pub fn requester(&self) -> Requester {
        Requester::Rider(self.user_id)
    }
}

impl FromRequest for RiderUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = AuthenticatedUser::authenticate(req).and_then(|user| {
            if !user.role.is_rider() {
                warn!(user_id = %user.user_id, role = %user.role, "Non-rider attempted rider access");
                return Err(AppError::Forbidden);
            }
            Ok(RiderUser(user))
        });

        ready(result.map_err(actix_web::Error::from))
    }
}

/// Company operator extractor
///
/// Requires the company role and a company bound to the token.
#[derive(Debug, Clone)]
pub struct CompanyUser {
    pub user: AuthenticatedUser,
    pub company_id: Uuid,
}

impl std::ops::Deref for CompanyUser {
    type Target = AuthenticatedUser;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl CompanyUser {
    pub fn requester(&self) -> Requester {
        Requester::CompanyOperator {
            company_id: self.company_id,
        }
    }
}

impl FromRequest for CompanyUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = AuthenticatedUser::authenticate(req).and_then(|user| {
            match (user.role.is_company(), user.company_id) {
                (true, Some(company_id)) => Ok(CompanyUser { user, company_id }),
                _ => {
                    warn!(user_id = %user.user_id, role = %user.role, "Company access denied");
                    Err(AppError::Forbidden)
                }
            }
        });

        ready(result.map_err(actix_web::Error::from))
    }
}
