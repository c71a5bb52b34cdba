//! Synchronous chat endpoint.
//!
//! POST /chat
//!
//! Body: `{ "message": "...", "session_id": "..." }` (`session_id` defaults
//! to `"default"`). Replies `{ "response": "..." }` once the provider has
//! produced the whole answer.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use vision_observe::genai_attrs::{OP_CHAT, TRANSPORT_SYNC};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::query::default_session_id;
use crate::state::AppState;

/// Request body for the sync chat endpoint.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub response: String,
}

/// POST /chat - one full exchange, answered in a single JSON body.
///
/// The user turn is kept in the session even when the provider fails.
pub async fn chat(
    State(state): State<AppState>,
    _auth: Authenticated,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, AppError> {
    let Json(body) = body?;
    let message = body.message.trim();
    if message.is_empty() {
        return Err(AppError::empty_message());
    }

    let span = tracing::info_span!(
        "chat",
        gen_ai.operation.name = OP_CHAT,
        gen_ai.provider.name = state.chat_service.provider_name(),
        vision.transport = TRANSPORT_SYNC,
        vision.session.id = %body.session_id,
    );

    let response = state
        .chat_service
        .send_message(&body.session_id, message)
        .instrument(span)
        .await?;

    Ok(Json(ChatReply { response }))
}
