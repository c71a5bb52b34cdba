//! LLM provider implementations.
//!
//! Contains the concrete implementation of the [`LlmProvider`] trait defined
//! in `vision-core` (AWS Bedrock), plus the factory that builds it from
//! configuration.
//!
//! [`LlmProvider`]: vision_core::llm::LlmProvider

pub mod bedrock;

use secrecy::SecretString;

use vision_core::llm::BoxLlmProvider;
use vision_types::config::ProviderConfig;
use vision_types::llm::LlmError;

use self::bedrock::BedrockProvider;

/// Create a [`BoxLlmProvider`] from a [`ProviderConfig`].
///
/// # Errors
///
/// Returns [`LlmError::AuthenticationFailed`] when no API key is configured,
/// or a provider error if the HTTP client cannot be built.
pub fn create_provider(config: &ProviderConfig) -> Result<BoxLlmProvider, LlmError> {
    let key = config
        .api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or(LlmError::AuthenticationFailed)?;
    let secret = SecretString::from(key.to_string());
    let provider = BedrockProvider::new(secret, config.model_id.clone(), config.region.clone())?;

    tracing::info!(
        provider = "bedrock",
        region = %provider.region(),
        "inference provider ready"
    );
    Ok(BoxLlmProvider::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_provider_requires_key() {
        let config = ProviderConfig::default();
        assert!(matches!(
            create_provider(&config),
            Err(LlmError::AuthenticationFailed)
        ));

        let blank = ProviderConfig {
            api_key: Some("  ".to_string()),
            ..ProviderConfig::default()
        };
        assert!(create_provider(&blank).is_err());
    }

    #[test]
    fn test_create_provider_bedrock() {
        let config = ProviderConfig {
            api_key: Some("bedrock-api-key-test-not-real".to_string()),
            ..ProviderConfig::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "bedrock");
    }
}
