//! Bearer-token authentication for the REST gateway.
//!
//! Tokens are HS256 JWTs whose `sub` claim is the acting user id.

use crate::errors::TaskpilotError;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::ApiError;

/// Audience every gateway token is issued for.
const TOKEN_AUDIENCE: &str = "taskpilot";

/// Ten years.
const MAX_TTL_HOURS: u64 = 87_600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique token id
    pub jti: String,
    pub aud: String,
}

pub struct JwtAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_hours: i64,
}

impl JwtAuth {
    pub fn new(secret: &str, ttl_hours: u64) -> Result<Self, TaskpilotError> {
        if secret.trim().is_empty() {
            return Err(TaskpilotError::Config(
                "gateway.authSecret must be set to issue or verify tokens".into(),
            ));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_hours: i64::try_from(ttl_hours.clamp(1, MAX_TTL_HOURS)).unwrap_or(24),
        })
    }

    pub fn issue_token(&self, user_id: &str) -> Result<String, TaskpilotError> {
        if user_id.trim().is_empty() {
            return Err(TaskpilotError::Auth("user id must not be empty".into()));
        }
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.ttl_hours)).timestamp(),
            jti: Uuid::new_v4().to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TaskpilotError::Internal(anyhow::anyhow!("failed to sign token: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, TaskpilotError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_audience(&[TOKEN_AUDIENCE]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            warn!("JWT validation failed: {:?}", e.kind());
            match e.kind() {
                ErrorKind::ExpiredSignature => TaskpilotError::Auth("Token has expired".into()),
                _ => TaskpilotError::Auth("Invalid token".into()),
            }
        })?;
        if data.claims.sub.trim().is_empty() {
            return Err(TaskpilotError::Auth("Invalid token: missing sub".into()));
        }
        Ok(data.claims)
    }
}

/// The authenticated caller, taken from `Authorization: Bearer <jwt>`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

impl<S> FromRequestParts<S> for AuthUser
where
    Arc<JwtAuth>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<JwtAuth>::from_ref(state);
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ApiError::from(TaskpilotError::Auth("Missing bearer token".into()))
            })?;
        let claims = auth.validate_token(token)?;
        debug!("authenticated request for {}", claims.sub);
        Ok(Self(claims.sub))
    }
}
