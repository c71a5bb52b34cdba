//! Query parameter extractors for the streaming endpoint.

use serde::Deserialize;

/// Query parameters of `GET /get_response`.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// User message; trimmed before use.
    #[serde(default)]
    pub message: String,
    /// Session to append to.
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

/// Token carried in the query string, for clients that cannot set headers.
#[derive(Debug, Deserialize, Default)]
pub struct AccessTokenQuery {
    pub access_token: Option<String>,
}

/// Session used when the client does not name one.
pub fn default_session_id() -> String {
    "default".to_string()
}
