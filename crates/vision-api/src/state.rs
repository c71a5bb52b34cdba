//! Application state wiring all services together.
//!
//! AppState holds the chat service and the auth settings used by the REST
//! handlers. `init` pins the core ports to the concrete infra
//! implementations (Bedrock provider, local blob store).

use std::sync::Arc;

use sha2::{Digest, Sha256};

use vision_core::chat::{ChatService, ChatSettings};
use vision_core::relay::RelayOptions;
use vision_core::session::SessionStore;
use vision_infra::llm::create_provider;
use vision_infra::storage::create_sink;
use vision_types::config::{AppConfig, AuthConfig};

/// Bearer-token settings, holding only a digest of the configured token.
#[derive(Clone)]
pub struct AuthSettings {
    token_digest: Option<[u8; 32]>,
    pub protect_stream: bool,
}

impl AuthSettings {
    pub fn from_config(config: &AuthConfig) -> Self {
        let token_digest = config
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(digest);
        Self {
            token_digest,
            protect_stream: config.protect_stream,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.token_digest.is_some()
    }

    /// Whether `presented` matches the configured token.
    ///
    /// Always false when no token is configured.
    pub fn verify(&self, presented: &str) -> bool {
        match &self.token_digest {
            Some(expected) => digest(presented) == *expected,
            None => false,
        }
    }
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("configured", &self.is_configured())
            .field("protect_stream", &self.protect_stream)
            .finish()
    }
}

/// SHA-256 of a token. Comparing digests keeps the comparison length fixed.
fn digest(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

/// Shared application state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub chat_service: Arc<ChatService>,
    pub auth: Arc<AuthSettings>,
}

impl AppState {
    pub fn new(chat_service: ChatService, auth: AuthSettings) -> Self {
        Self {
            chat_service: Arc::new(chat_service),
            auth: Arc::new(auth),
        }
    }

    /// Wire the provider, session store and persistence sink from `config`.
    pub fn init(config: &AppConfig) -> anyhow::Result<Self> {
        let provider = create_provider(&config.provider)?;
        let sink = create_sink(&config.persistence);
        let store = Arc::new(SessionStore::new(
            config.conversation.max_history_messages,
        ));

        let system_prompt = Some(config.conversation.system_prompt.clone())
            .filter(|p| !p.trim().is_empty());
        let settings = ChatSettings {
            system_prompt,
            sampling: config.sampling,
            relay: RelayOptions::default(),
        };

        let auth = AuthSettings::from_config(&config.auth);
        if !auth.is_configured() {
            tracing::warn!("no auth token configured: every protected request will be rejected");
        }

        Ok(Self::new(
            ChatService::new(store, provider, sink, settings),
            auth,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_matches_only_configured_token() {
        let auth = AuthSettings::from_config(&AuthConfig {
            token: Some("s3cret".to_string()),
            protect_stream: true,
        });
        assert!(auth.is_configured());
        assert!(auth.verify("s3cret"));
        assert!(!auth.verify("s3cret "));
        assert!(!auth.verify(""));
    }

    #[test]
    fn missing_token_rejects_everything() {
        let auth = AuthSettings::from_config(&AuthConfig::default());
        assert!(!auth.is_configured());
        assert!(!auth.verify(""));
        assert!(!auth.verify("anything"));
    }

    #[test]
    fn debug_hides_digest() {
        let auth = AuthSettings::from_config(&AuthConfig {
            token: Some("s3cret".to_string()),
            protect_stream: false,
        });
        let debug = format!("{auth:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("configured: true"));
    }
}
