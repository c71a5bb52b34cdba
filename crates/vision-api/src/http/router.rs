//! Axum router configuration with middleware.
//!
//! Routes:
//! - `GET /get_response`: streamed reply (SSE)
//! - `POST /chat`: whole reply as JSON
//! - `GET /health`: liveness
//!
//! Middleware: permissive CORS (any origin, method, header) and request
//! tracing without query strings.

use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/get_response", get(handlers::stream::get_response))
        .route("/chat", post(handlers::chat::chat))
        .route("/health", get(handlers::health::health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
}

/// Span for one HTTP request. Records the path only: the query string can
/// carry `access_token`.
fn request_span(request: &Request<Body>) -> Span {
    tracing::debug_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        version = ?request.version(),
    )
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use tracing_subscriber::fmt::MakeWriter;

    use vision_core::chat::{ChatService, ChatSettings};
    use vision_core::llm::box_provider::BoxLlmProvider;
    use vision_core::llm::mock::{ProviderProbe, ScriptedProvider};
    use vision_core::persistence::sink::PersistenceSink;
    use vision_core::session::SessionStore;
    use vision_types::config::AuthConfig;
    use vision_types::turn::Role;

    use super::*;
    use crate::http::error::{EMPTY_MESSAGE, INTERNAL_MESSAGE, UNAUTHORIZED_MESSAGE};
    use crate::state::AuthSettings;

    const TOKEN: &str = "test-token";

    struct Fixture {
        router: Router,
        store: Arc<SessionStore>,
        probe: ProviderProbe,
    }

    fn fixture_with(provider: ScriptedProvider, protect_stream: bool) -> Fixture {
        let probe = provider.probe();
        let store = Arc::new(SessionStore::new(20));
        let service = ChatService::new(
            store.clone(),
            BoxLlmProvider::new(provider),
            PersistenceSink::disabled(),
            ChatSettings::default(),
        );
        let auth = AuthSettings::from_config(&AuthConfig {
            token: Some(TOKEN.to_string()),
            protect_stream,
        });
        Fixture {
            router: build_router(AppState::new(service, auth)),
            store,
            probe,
        }
    }

    fn fixture(provider: ScriptedProvider) -> Fixture {
        fixture_with(provider, true)
    }

    fn post_chat(body: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_stream(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn text_body(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn chat_returns_reply_and_records_exchange() {
        let fx = fixture(ScriptedProvider::replying(&["Hello", "!"]));

        let response = fx
            .router
            .oneshot(post_chat(r#"{"message":"Hi","session_id":"s1"}"#, Some(TOKEN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "response": "Hello!" }));

        let history = fx.store.history("s1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].text, "Hi");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].text, "Hello!");
    }

    #[tokio::test]
    async fn chat_defaults_session_id() {
        let fx = fixture(ScriptedProvider::replying(&["ok"]));

        let response = fx
            .router
            .oneshot(post_chat(r#"{"message":"Hi"}"#, Some(TOKEN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(fx.store.len("default"), 2);
    }

    #[tokio::test]
    async fn chat_without_token_is_rejected_untouched() {
        let fx = fixture(ScriptedProvider::replying(&["never"]));

        let response = fx
            .router
            .oneshot(post_chat(r#"{"message":"Hi","session_id":"s1"}"#, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], UNAUTHORIZED_MESSAGE);
        assert_eq!(fx.store.session_count(), 0);
        assert_eq!(fx.probe.calls(), 0);
    }

    #[tokio::test]
    async fn chat_with_wrong_token_is_rejected() {
        let fx = fixture(ScriptedProvider::replying(&["never"]));

        let response = fx
            .router
            .oneshot(post_chat(r#"{"message":"Hi"}"#, Some("nope")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(fx.store.session_count(), 0);
    }

    #[tokio::test]
    async fn chat_with_blank_message_is_bad_request() {
        let fx = fixture(ScriptedProvider::replying(&["never"]));

        let response = fx
            .router
            .oneshot(post_chat(r#"{"message":"   ","session_id":"s1"}"#, Some(TOKEN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], EMPTY_MESSAGE);
        assert_eq!(fx.probe.calls(), 0);
        assert_eq!(fx.store.session_count(), 0);
    }

    #[tokio::test]
    async fn chat_with_malformed_json_is_bad_request() {
        let fx = fixture(ScriptedProvider::replying(&["never"]));

        let response = fx
            .router
            .oneshot(post_chat("{not json", Some(TOKEN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
        assert_eq!(fx.probe.calls(), 0);
    }

    #[tokio::test]
    async fn chat_provider_failure_is_generic_500() {
        let fx = fixture(ScriptedProvider::replying(&["x"]).failing_after(0));

        let response = fx
            .router
            .oneshot(post_chat(r#"{"message":"Hi","session_id":"s1"}"#, Some(TOKEN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await, json!({ "error": INTERNAL_MESSAGE }));
        let history = fx.store.history("s1");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::User);
    }

    #[tokio::test]
    async fn stream_emits_fragments_then_single_end() {
        let fx = fixture(ScriptedProvider::replying(&["Hel", "lo"]));

        let response = fx
            .router
            .oneshot(get_stream("/get_response?message=Hi&session_id=s1", Some(TOKEN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/event-stream"));

        let body = text_body(response).await;
        assert!(body.contains("event: text_delta\ndata: {\"text\":\"Hel\"}"));
        assert!(body.contains("event: text_delta\ndata: {\"text\":\"lo\"}"));
        assert_eq!(body.matches("[END]").count(), 1);
        assert!(body.trim_end().ends_with("data: [END]"));
        assert!(!body.contains("event: error"));

        let history = fx.store.history("s1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].text, "Hello");
    }

    #[tokio::test]
    async fn stream_failure_sends_notice_then_end() {
        let fx = fixture(ScriptedProvider::replying(&["a", "b"]).failing_after(1));

        let response = fx
            .router
            .oneshot(get_stream("/get_response?message=Hi&session_id=s1", Some(TOKEN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = text_body(response).await;
        let notice = body.find("event: error").unwrap();
        let end = body.find("[END]").unwrap();
        assert!(notice < end);
        assert_eq!(body.matches("[END]").count(), 1);
        assert_eq!(fx.store.len("s1"), 1);
    }

    #[tokio::test]
    async fn stream_with_blank_message_is_bad_request() {
        let fx = fixture(ScriptedProvider::replying(&["never"]));

        let response = fx
            .router
            .oneshot(get_stream("/get_response?message=%20%20", Some(TOKEN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(fx.probe.calls(), 0);
    }

    #[tokio::test]
    async fn protected_stream_requires_token() {
        let fx = fixture(ScriptedProvider::replying(&["never"]));

        let response = fx
            .router
            .oneshot(get_stream("/get_response?message=Hi", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(fx.store.session_count(), 0);
        assert_eq!(fx.probe.calls(), 0);
    }

    #[tokio::test]
    async fn stream_accepts_access_token_query() {
        let fx = fixture(ScriptedProvider::replying(&["ok"]));

        let uri = format!("/get_response?message=Hi&access_token={TOKEN}");
        let response = fx.router.oneshot(get_stream(&uri, None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(text_body(response).await.contains("[END]"));
    }

    #[tokio::test]
    async fn unprotected_stream_skips_auth() {
        let fx = fixture_with(ScriptedProvider::replying(&["ok"]), false);

        let response = fx
            .router
            .oneshot(get_stream("/get_response?message=Hi", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(text_body(response).await.contains("[END]"));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn access_token_never_reaches_request_logs() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(logs.clone())
            .finish();
        let _default = tracing::subscriber::set_default(subscriber);

        let fx = fixture(ScriptedProvider::replying(&["ok"]));
        let uri = format!("/get_response?message=Hi&access_token={TOKEN}");
        let response = fx.router.oneshot(get_stream(&uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(text_body(response).await.contains("[END]"));

        let output = logs.contents();
        assert!(output.contains("path=/get_response"));
        assert!(!output.contains(TOKEN));
        assert!(!output.contains("access_token="));
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let fx = fixture(ScriptedProvider::replying(&[]));

        let response = fx
            .router
            .oneshot(get_stream("/health", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["sessions"], 0);
    }
}
