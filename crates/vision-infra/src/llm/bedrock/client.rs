//! BedrockProvider -- concrete [`LlmProvider`] implementation for AWS Bedrock.
//!
//! Sends requests to the Bedrock Runtime Converse API using Bearer token
//! authentication (Bedrock API keys). Supports both non-streaming
//! (`converse`) and streaming (`converse-stream`) modes.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use vision_core::llm::{LlmProvider, LlmStream};
use vision_types::llm::{CompletionRequest, CompletionResponse, LlmError, StopReason, Usage};
use vision_types::turn::{Role, Turn};

use super::streaming::create_converse_stream;
use super::types::{ContentBlock, ConverseMessage, ConverseRequest, ConverseResponse, InferenceConfig, SystemBlock};

/// AWS Bedrock LLM provider.
///
/// # API Key Security
///
/// The API key is stored as a [`SecretString`] and is only exposed when
/// constructing HTTP request headers. It never appears in Debug output.
pub struct BedrockProvider {
    client: reqwest::Client,
    api_key: SecretString,
    region: String,
    model_id: String,
}

impl BedrockProvider {
    /// Prefix used to identify Bedrock API keys.
    const KEY_PREFIX: &'static str = "bedrock-api-key-";

    /// Whole-request timeout. Streams for long replies stay well inside it.
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

    /// Create a new Bedrock provider.
    ///
    /// * `api_key` - Bedrock bearer token. If it starts with
    ///   `bedrock-api-key-`, the prefix is stripped and the remainder is used
    ///   as the Bearer token. The token is a base64-encoded presigned URL
    ///   containing SigV4 params.
    /// * `model_id` - Bedrock model id (e.g., "meta.llama3-1-405b-instruct-v1:0")
    /// * `region` - AWS region (e.g., "us-west-2"). If the token's embedded
    ///   credential scope names a different region, that region wins.
    pub fn new(api_key: SecretString, model_id: String, region: String) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        // Strip the bedrock-api-key- prefix so only the base64 token is used
        // as the Bearer token in HTTP requests.
        let raw_key = api_key.expose_secret();
        let token_part = raw_key.strip_prefix(Self::KEY_PREFIX).unwrap_or(raw_key);
        let effective_region = Self::detect_region_from_token(token_part).unwrap_or(region);
        let bearer_token = SecretString::from(token_part.to_string());

        Ok(Self {
            client,
            api_key: bearer_token,
            region: effective_region,
            model_id,
        })
    }

    /// Try to extract the AWS region from a base64-encoded presigned URL token.
    ///
    /// The token decodes to a URL like:
    /// `bedrock.amazonaws.com/?...&X-Amz-Credential=AKIA.../20260212/us-east-1/bedrock/aws4_request&...`
    fn detect_region_from_token(token: &str) -> Option<String> {
        use base64::Engine;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(token)
            .ok()?;
        let text = String::from_utf8(decoded).ok()?;

        // X-Amz-Credential=<access-key>/<date>/<region>/<service>/aws4_request
        let cred_start = text.find("X-Amz-Credential=")?;
        let cred_value = &text[cred_start + "X-Amz-Credential=".len()..];
        let region = cred_value.split('/').nth(2)?;
        let region = region.split('&').next().unwrap_or(region);
        if region.is_empty() {
            return None;
        }
        tracing::info!(region = %region, "detected region from Bedrock bearer token");
        Some(region.to_string())
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Build the full Bedrock Runtime URL for a given action.
    fn url(&self, action: &str) -> String {
        format!(
            "https://bedrock-runtime.{}.amazonaws.com/model/{}/{}",
            self.region, self.model_id, action
        )
    }

    /// Convert a generic [`CompletionRequest`] into a [`ConverseRequest`].
    ///
    /// Converse wants a conversation that opens with a user message and
    /// alternates roles. The window is a raw suffix of the history, so
    /// leading assistant turns are dropped and consecutive same-role turns
    /// (left behind by failed exchanges) are merged.
    fn to_converse_request(request: &CompletionRequest) -> ConverseRequest {
        let system = request
            .system
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|text| {
                vec![SystemBlock {
                    text: text.to_string(),
                }]
            })
            .unwrap_or_default();

        ConverseRequest {
            messages: converse_messages(&request.messages),
            system,
            inference_config: InferenceConfig {
                max_tokens: request.sampling.max_tokens,
                temperature: request.sampling.temperature,
                top_p: request.sampling.top_p,
            },
        }
    }
}

fn converse_messages(turns: &[Turn]) -> Vec<ConverseMessage> {
    let mut merged: Vec<(Role, String)> = Vec::new();
    for turn in turns.iter().skip_while(|t| t.role != Role::User) {
        match merged.last_mut() {
            Some((role, text)) if *role == turn.role => {
                text.push_str("\n\n");
                text.push_str(&turn.text);
            }
            _ => merged.push((turn.role, turn.text.clone())),
        }
    }
    merged
        .into_iter()
        .map(|(role, text)| ConverseMessage {
            role: role.to_string(),
            content: vec![ContentBlock::text(text)],
        })
        .collect()
}

/// Map a non-success HTTP status onto an [`LlmError`].
pub(super) fn status_error(status: reqwest::StatusCode, body: &str) -> LlmError {
    match status.as_u16() {
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited {
            retry_after_ms: None,
        },
        503 => LlmError::Overloaded(body.to_string()),
        400 => LlmError::InvalidRequest(body.to_string()),
        s if s >= 500 => LlmError::Provider {
            message: format!("Bedrock server error HTTP {status}: {body}"),
        },
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {body}"),
        },
    }
}

/// POST a Converse body and fail on any non-success status.
pub(super) async fn post_converse(
    client: &reqwest::Client,
    url: &str,
    api_key: &SecretString,
    body: &ConverseRequest,
) -> Result<reqwest::Response, LlmError> {
    let response = client
        .post(url)
        .bearer_auth(api_key.expose_secret())
        .json(body)
        .send()
        .await
        .map_err(|e| LlmError::Provider {
            message: format!("HTTP request failed: {e}"),
        })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_body = response.text().await.unwrap_or_default();
    tracing::warn!(status = %status, body = %error_body, url = %url, "Bedrock API error response");
    Err(status_error(status, &error_body))
}

// BedrockProvider intentionally does NOT derive Debug to prevent
// accidental exposure of internal state.

impl LlmProvider for BedrockProvider {
    fn name(&self) -> &str {
        "bedrock"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = Self::to_converse_request(request);
        let url = self.url("converse");

        tracing::debug!(model_id = %self.model_id, region = %self.region, turns = body.messages.len(), "Bedrock converse request");

        let response = post_converse(&self.client, &url, &self.api_key, &body).await?;
        let converse: ConverseResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        Ok(CompletionResponse {
            content: converse.text(),
            stop_reason: StopReason::parse_lenient(converse.stop_reason.as_deref()),
            usage: Usage {
                input_tokens: converse.usage.input_tokens,
                output_tokens: converse.usage.output_tokens,
            },
        })
    }

    fn stream(&self, request: CompletionRequest) -> LlmStream {
        let body = Self::to_converse_request(&request);
        let url = self.url("converse-stream");

        tracing::debug!(model_id = %self.model_id, region = %self.region, turns = body.messages.len(), "Bedrock converse-stream request");

        create_converse_stream(&self.client, &url, body, &self.api_key)
    }
}
