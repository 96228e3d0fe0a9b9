//! Authentication extractor.
//!
//! When `AUTH_SECRET` is configured every control request must carry
//! `Authorization: Bearer <AUTH_SECRET>`. Without a secret the API is open,
//! which is only meant for local development.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AppError;
use crate::AppState;

/// Caller that passed the bearer check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthUser {
    Operator,
    /// No secret is configured.
    Anonymous,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(secret) = state.config.auth_secret.as_deref() else {
            return Ok(AuthUser::Anonymous);
        };

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthorized("Missing authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized("Invalid authorization header format"))?;

        if token.is_empty() || !constant_time_eq(token.as_bytes(), secret.as_bytes()) {
            tracing::warn!("Rejected control request with bad bearer token");
            return Err(AppError::Unauthorized("Invalid bearer token"));
        }

        Ok(AuthUser::Operator)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
