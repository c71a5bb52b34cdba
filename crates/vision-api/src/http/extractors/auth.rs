//! Bearer token authentication extractors.
//!
//! Tokens are read from:
//! - `Authorization: Bearer <token>` header (both endpoints)
//! - `access_token` query parameter (streaming endpoint only, since browser
//!   `EventSource` cannot set headers)
//!
//! Tokens are SHA-256 hashed and compared against the configured token's
//! digest.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;

use super::query::AccessTokenQuery;
use crate::http::error::AppError;
use crate::state::AppState;

/// Authenticated request marker for the synchronous endpoint.
pub struct Authenticated;

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            Some(token) if state.auth.verify(token) => Ok(Authenticated),
            presented => {
                tracing::debug!(token_present = presented.is_some(), "rejected request with missing or invalid token");
                Err(AppError::Unauthorized)
            }
        }
    }
}

/// Access check for the streaming endpoint.
///
/// Passes every request when `auth.protect_stream` is off.
pub struct StreamAccess;

impl FromRequestParts<AppState> for StreamAccess {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !state.auth.protect_stream {
            return Ok(StreamAccess);
        }

        let query_token = Query::<AccessTokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.access_token);
        let token = bearer_token(parts).map(str::to_string).or(query_token);

        match token {
            Some(token) if state.auth.verify(&token) => Ok(StreamAccess),
            presented => {
                tracing::debug!(token_present = presented.is_some(), "rejected stream with missing or invalid token");
                Err(AppError::Unauthorized)
            }
        }
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}
