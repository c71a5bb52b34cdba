//! SSE streaming chat endpoint.
//!
//! GET /get_response?message=...&session_id=...
//!
//! SSE event types:
//! - `text_delta`: incremental text, `{ "text": "..." }`
//! - `error`: generic failure notice, `{ "message": "..." }`
//! - `done`: end of the reply, data `[END]`
//!
//! Exactly one `done` closes every stream that was not cut short by the
//! client.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::{Stream, StreamExt};
use serde_json::json;

use vision_core::relay::RelayEvent;
use vision_observe::genai_attrs::{OP_CHAT, TRANSPORT_SSE};

use crate::http::error::AppError;
use crate::http::extractors::auth::StreamAccess;
use crate::http::extractors::query::StreamQuery;
use crate::state::AppState;

/// Data carried by the final `done` event.
pub const END_MARKER: &str = "[END]";

const KEEP_ALIVE: Duration = Duration::from_secs(15);

/// GET /get_response - stream the reply as server-sent events.
///
/// The relay runs in its own task; dropping the response body (client
/// disconnect) cancels it and leaves the session without an assistant turn.
pub async fn get_response(
    State(state): State<AppState>,
    _access: StreamAccess,
    query: Result<Query<StreamQuery>, QueryRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let Query(query) = query?;
    let message = query.message.trim();
    if message.is_empty() {
        return Err(AppError::empty_message());
    }

    let span = tracing::info_span!(
        "chat",
        gen_ai.operation.name = OP_CHAT,
        gen_ai.provider.name = state.chat_service.provider_name(),
        vision.transport = TRANSPORT_SSE,
        vision.session.id = %query.session_id,
    );
    // The relay task picks this span up as its parent.
    let (events, _task) = span
        .in_scope(|| state.chat_service.stream_message(&query.session_id, message))
        .into_parts();

    let sse_stream = events.map(|event| Ok::<_, Infallible>(sse_event(event)));
    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE)))
}

fn sse_event(event: RelayEvent) -> Event {
    match event {
        RelayEvent::Fragment(text) => Event::default()
            .event("text_delta")
            .data(json!({ "text": text }).to_string()),
        RelayEvent::ErrorNotice(message) => Event::default()
            .event("error")
            .data(json!({ "message": message }).to_string()),
        RelayEvent::End => Event::default().event("done").data(END_MARKER),
    }
}
