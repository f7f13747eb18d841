use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::{config::AppConfig, errors::AppError};

/// Fallback header carrying the raw admin token when `Authorization` is not usable.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Lifetime of an issued admin token.
pub const TOKEN_TTL_HOURS: i64 = 8;

/// Role claim every admin token carries.
pub const ADMIN_ROLE: &str = "admin";

/// Claims
///
/// Payload of an admin token, signed with HS256 and the server's `JWT_SECRET`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the admin username the token was issued to.
    pub sub: String,
    /// Always "admin".
    pub role: String,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
}

/// AdminUser
///
/// The resolved identity of a request that passed the admin gate.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub username: String,
}

fn signing_secret(config: &AppConfig) -> Result<&str, AppError> {
    config
        .jwt_secret
        .as_deref()
        .ok_or_else(|| AppError::Config("JWT_SECRET is not configured".to_string()))
}

/// issue_token
///
/// Signs a fresh admin token for `username`, valid for eight hours.
pub fn issue_token(username: &str, secret: &str) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: username.to_string(),
        role: ADMIN_ROLE.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!(error = ?e, "failed to sign admin token");
        AppError::Config("Could not sign token".to_string())
    })
}

/// verify_token
///
/// Checks signature, expiry and role. Every failure maps to 401.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        match e.kind() {
            ErrorKind::ExpiredSignature => tracing::debug!("admin token expired"),
            other => tracing::debug!(kind = ?other, "admin token rejected"),
        }
        AppError::Unauthorized("Invalid or expired token".to_string())
    })?;

    if data.claims.role != ADMIN_ROLE {
        return Err(AppError::Unauthorized("Invalid or expired token".to_string()));
    }

    Ok(data.claims)
}

/// bearer_token
///
/// `Authorization: Bearer <token>` first, then the `x-admin-token` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let from_authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    from_authorization
        .or_else(|| {
            headers
                .get(ADMIN_TOKEN_HEADER)
                .and_then(|value| value.to_str().ok())
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// check_credentials
///
/// Login check against the configured admin user and password, both compared after
/// trimming. An unconfigured password is a server error, not a failed login.
pub fn check_credentials(config: &AppConfig, user: &str, pass: &str) -> Result<(), AppError> {
    let expected_pass = config
        .admin_pass
        .as_deref()
        .ok_or_else(|| AppError::Config("ADMIN_PASS is not configured".to_string()))?;

    if user.trim() != config.admin_user.trim() || pass.trim() != expected_pass.trim() {
        tracing::warn!(user = %user.trim(), "rejected admin login");
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }
    Ok(())
}

/// login
///
/// Validates the credentials and issues a token signed with the configured secret.
pub fn login(config: &AppConfig, user: &str, pass: &str) -> Result<String, AppError> {
    check_credentials(config, user, pass)?;
    let secret = signing_secret(config)?;
    issue_token(user.trim(), secret)
}

/// AdminUser Extractor Implementation
///
/// Makes `AdminUser` usable as a handler argument or inside a `from_fn_with_state`
/// middleware. Rejections are `AppError`s, so they render as `{message}` JSON:
/// 500 when no secret is configured, 401 for a missing, invalid or expired token.
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;

        let secret = signing_secret(&config)?;
        let claims = verify_token(token, secret)?;

        Ok(AdminUser {
            username: claims.sub,
        })
    }
}
