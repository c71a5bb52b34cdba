//! AWS Bedrock Converse API request/response types.
//!
//! Converse is model-agnostic: the same JSON shape works for every model
//! family hosted on Bedrock. The model id travels in the URL path, never in
//! the body.

use serde::{Deserialize, Serialize};

/// Request body for `converse` and `converse-stream`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseRequest {
    pub messages: Vec<ConverseMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub system: Vec<SystemBlock>,
    pub inference_config: InferenceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConverseMessage {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

/// One content block. Only text blocks are produced or read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemBlock {
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

/// Non-streaming `converse` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseResponse {
    pub output: ConverseOutput,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: ConverseUsage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConverseOutput {
    #[serde(default)]
    pub message: Option<ConverseMessage>,
}

impl ConverseResponse {
    /// Concatenated text of every text block in the reply.
    pub fn text(&self) -> String {
        self.output
            .message
            .as_ref()
            .map(|m| {
                m.content
                    .iter()
                    .filter_map(|block| block.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

// --- converse-stream event payloads ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlockDeltaPayload {
    #[serde(default)]
    pub content_block_index: u32,
    pub delta: TextDeltaPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextDeltaPayload {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStopPayload {
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetadataPayload {
    #[serde(default)]
    pub usage: Option<ConverseUsage>,
}

/// Payload of an `exception` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct ExceptionPayload {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converse_request_serialization() {
        let req = ConverseRequest {
            messages: vec![ConverseMessage {
                role: "user".to_string(),
                content: vec![ContentBlock::text("Ciao")],
            }],
            system: vec![SystemBlock {
                text: "Sei Vision.".to_string(),
            }],
            inference_config: InferenceConfig {
                max_tokens: 1024,
                temperature: 0.7,
                top_p: 0.9,
            },
        };

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"][0]["text"], "Ciao");
        assert_eq!(json["system"][0]["text"], "Sei Vision.");
        assert_eq!(json["inferenceConfig"]["maxTokens"], 1024);
        assert_eq!(json["inferenceConfig"]["topP"], 0.9);
        // model id lives in the URL
        assert!(json.get("modelId").is_none());
    }

    #[test]
    fn test_empty_system_is_omitted() {
        let req = ConverseRequest {
            messages: vec![],
            system: vec![],
            inference_config: InferenceConfig {
                max_tokens: 10,
                temperature: 0.0,
                top_p: 1.0,
            },
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("system").is_none());
    }

    #[test]
    fn test_converse_response_text_concatenates_blocks() {
        let json = r#"{
            "output": {"message": {"role": "assistant", "content": [{"text": "Hel"}, {"text": "lo!"}]}},
            "stopReason": "end_turn",
            "usage": {"inputTokens": 12, "outputTokens": 3, "totalTokens": 15},
            "metrics": {"latencyMs": 420}
        }"#;
        let resp: ConverseResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.text(), "Hello!");
        assert_eq!(resp.stop_reason.as_deref(), Some("end_turn"));
        assert_eq!(resp.usage.input_tokens, 12);
        assert_eq!(resp.usage.output_tokens, 3);
    }

    #[test]
    fn test_converse_response_without_message() {
        let resp: ConverseResponse = serde_json::from_str(r#"{"output": {}}"#).unwrap();
        assert_eq!(resp.text(), "");
    }
}
