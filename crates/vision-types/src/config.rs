//! Configuration types for Vision.
//!
//! `AppConfig` represents the optional `config.toml` plus environment
//! overrides. Every field has a default, so an empty file is a valid
//! configuration.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::llm::SamplingConfig;

/// Default persona instruction sent as the system prompt on every call.
pub const DEFAULT_SYSTEM_PROMPT: &str = "Sei un assistente AI utile e cordiale specializzato nell'istruzione. \
Rispondi sempre e solo in italiano. \
Alle domande su chi sei rispondi sempre: Sono Vision, un'AI creata da Cla!. \
Alle domande relative su chi ti ha creato rispondi sempre: Sono stato creato dal team di Cla!";

/// Top-level configuration for the relay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl AppConfig {
    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.conversation.max_history_messages == 0 {
            return Err(invalid(
                "conversation.max_history_messages",
                "must be at least 1",
            ));
        }
        if self.sampling.max_tokens == 0 {
            return Err(invalid("sampling.max_tokens", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.sampling.temperature) {
            return Err(invalid("sampling.temperature", "must be within 0.0..=1.0"));
        }
        if !(self.sampling.top_p > 0.0 && self.sampling.top_p <= 1.0) {
            return Err(invalid("sampling.top_p", "must be within (0.0, 1.0]"));
        }
        if self.provider.model_id.trim().is_empty() {
            return Err(invalid("provider.model_id", "must not be empty"));
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Network binding for the HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Conversation window and persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Number of most recent turns sent to the model.
    #[serde(default = "default_max_history_messages")]
    pub max_history_messages: usize,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_max_history_messages() -> usize {
    10
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_history_messages: default_max_history_messages(),
            system_prompt: default_system_prompt(),
        }
    }
}

/// Static bearer token check.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared secret expected in `Authorization: Bearer <token>`.
    /// When absent every protected request is rejected.
    #[serde(default)]
    pub token: Option<String>,
    /// Also require the token on the streaming entry point.
    #[serde(default = "default_protect_stream")]
    pub protect_stream: bool,
}

fn default_protect_stream() -> bool {
    true
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token: None,
            protect_stream: default_protect_stream(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("protect_stream", &self.protect_stream)
            .finish()
    }
}

/// AWS Bedrock Runtime connection settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Bedrock API key used as a bearer token.
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_region() -> String {
    "us-west-2".to_string()
}

fn default_model_id() -> String {
    "meta.llama3-1-405b-instruct-v1:0".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            model_id: default_model_id(),
            api_key: None,
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("region", &self.region)
            .field("model_id", &self.model_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Transcript mirroring. Disabled when `dir` is unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}
