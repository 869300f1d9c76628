//! Anthropic Messages API

use serde::{Deserialize, Serialize};

use super::{require_api_key, ProviderAdapter};
use crate::ai::config::ProviderConfig;
use crate::ai::error::AiError;
use crate::ai::http_client::WireRequest;
use crate::ai::types::TokenUsage;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Message content block
#[derive(Serialize)]
struct MessageContent<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    text: &'a str,
}

/// Message in conversation
#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<MessageContent<'a>>,
}

/// API request body
#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

/// Content block in API response
#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

/// API response body
#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

/// `x-api-key` + `anthropic-version` adapter
pub struct AnthropicAdapter;

impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn build_request(&self, prompt: &str, config: &ProviderConfig) -> Result<WireRequest, AiError> {
        let api_key = require_api_key(config)?;

        let request = ApiRequest {
            model: &config.model,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            system: config.system_prompt.as_deref(),
            messages: vec![Message {
                role: "user",
                content: vec![MessageContent {
                    content_type: "text",
                    text: prompt,
                }],
            }],
        };
        let body = serde_json::to_vec(&request)
            .map_err(|e| AiError::InvalidRequest(format!("body serialization: {}", e)))?;

        Ok(WireRequest::post_json(&config.endpoint, body)
            .with_header("x-api-key", api_key)
            .with_header("anthropic-version", ANTHROPIC_VERSION))
    }

    fn parse_response(&self, body: &[u8]) -> Result<(String, TokenUsage), AiError> {
        let response: ApiResponse = serde_json::from_slice(body)
            .map_err(|e| AiError::ResponseFormat(format!("Failed to parse response: {}", e)))?;

        let texts: Vec<String> = response
            .content
            .into_iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text)
            .collect();

        if texts.is_empty() {
            return Err(AiError::ResponseFormat("no text block in content".to_string()));
        }

        let usage = response
            .usage
            .map(|u| TokenUsage::new(u.input_tokens, u.output_tokens, None))
            .unwrap_or_default();

        Ok((texts.join("").trim().to_string(), usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::config::Credentials;
    use serde_json::Value;

    fn config() -> ProviderConfig {
        ProviderConfig::for_provider("anthropic")
            .unwrap()
            .with_credentials(Credentials::api_key("sk-ant-test"))
    }

    #[test]
    fn test_build_request_headers_and_body() {
        let request = AnthropicAdapter.build_request("hello", &config()).unwrap();
        assert_eq!(request.header("x-api-key"), Some("sk-ant-test"));
        assert_eq!(request.header("anthropic-version"), Some(ANTHROPIC_VERSION));
        assert_eq!(request.header("authorization"), None);

        let body: Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["model"], "claude-sonnet-4-5");
        assert!(body["system"].as_str().unwrap().contains("code review"));
        assert_eq!(body["messages"][0]["content"][0]["type"], "text");
        assert_eq!(body["messages"][0]["content"][0]["text"], "hello");
    }

    #[test]
    fn test_system_prompt_omitted_when_unset() {
        let config = config().with_system_prompt(None);
        let request = AnthropicAdapter.build_request("hello", &config).unwrap();
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        assert!(body.get("system").is_none());
    }

    #[test]
    fn test_parse_fixture() {
        let fixture = br#"{
            "id": "msg_1",
            "type": "message",
            "content": [
                {"type": "text", "text": "First part. "},
                {"type": "tool_use", "id": "t1"},
                {"type": "text", "text": "Second part."}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 20, "output_tokens": 7}
        }"#;
        let (text, usage) = AnthropicAdapter.parse_response(fixture).unwrap();
        assert_eq!(text, "First part. Second part.");
        assert_eq!(usage, TokenUsage::new(Some(20), Some(7), Some(27)));
    }

    #[test]
    fn test_parse_openai_shape_is_rejected() {
        let fixture = br#"{"choices": [{"message": {"content": "hi"}}]}"#;
        assert!(matches!(
            AnthropicAdapter.parse_response(fixture),
            Err(AiError::ResponseFormat(_))
        ));
    }
}
