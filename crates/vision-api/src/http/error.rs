//! Application error type mapping to HTTP status codes and `{"error": ..}`.
//!
//! Client-facing texts are fixed and generic; upstream details are logged
//! here and never sent.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use vision_types::llm::LlmError;

pub const UNAUTHORIZED_MESSAGE: &str = "Non autorizzato";
pub const EMPTY_MESSAGE: &str = "Messaggio vuoto";
pub const INTERNAL_MESSAGE: &str = "Errore interno del server";

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Missing or wrong bearer token.
    Unauthorized,
    /// Malformed or empty input; the text is safe to show.
    Validation(String),
    /// Inference backend failure.
    Upstream(LlmError),
    /// Anything else that went wrong on our side.
    Internal(String),
}

impl AppError {
    pub fn empty_message() -> Self {
        AppError::Validation(EMPTY_MESSAGE.to_string())
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        AppError::Upstream(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Upstream(e) => {
                tracing::error!(error = %e, "inference request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
            }
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
