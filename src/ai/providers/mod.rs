//! Provider adapters
//!
//! Each vendor gets one adapter that turns a plain prompt into that vendor's
//! wire request and the vendor's response back into text plus token usage.
//! Adapters hold no mutable state and are shared by every in-flight call.

mod anthropic;
mod bedrock;
mod google;
mod openai;
mod sigv4;

pub use anthropic::AnthropicAdapter;
pub use bedrock::{bedrock_body, model_family, strip_model_arn, BedrockAdapter, ModelFamily};
pub use google::GoogleAdapter;
pub use openai::OpenAiAdapter;

use serde_json::Value;

use super::config::ProviderConfig;
use super::error::AiError;
use super::http_client::WireRequest;
use super::types::TokenUsage;

/// Wire-format strategy for one vendor
pub trait ProviderAdapter: Send + Sync {
    /// Vendor name as reported on replies
    fn name(&self) -> &'static str;

    /// Build `(url, headers, body)` for one prompt. Must not depend on
    /// anything other than its inputs, apart from explicit timestamp fields.
    fn build_request(&self, prompt: &str, config: &ProviderConfig) -> Result<WireRequest, AiError>;

    /// Extract the generated text and usage counters from a 2xx body
    fn parse_response(&self, body: &[u8]) -> Result<(String, TokenUsage), AiError>;
}

/// Pick the adapter for a provider name
pub fn adapter_for(config: &ProviderConfig) -> Result<Box<dyn ProviderAdapter>, AiError> {
    match config.provider.to_lowercase().as_str() {
        "openai" | "openai-compatible" | "xai" | "grok" | "deepseek" => {
            Ok(Box::new(OpenAiAdapter))
        }
        "anthropic" | "claude" => Ok(Box::new(AnthropicAdapter)),
        "google" | "gemini" => Ok(Box::new(GoogleAdapter)),
        "bedrock" | "aws" => Ok(Box::new(BedrockAdapter::new(&config.model))),
        other => Err(AiError::UnknownProvider(other.to_string())),
    }
}

/// Parse a body as JSON, mapping failures to `ResponseFormat`
pub(crate) fn parse_json(body: &[u8]) -> Result<Value, AiError> {
    serde_json::from_slice(body).map_err(|e| {
        let preview: String = String::from_utf8_lossy(body).chars().take(200).collect();
        AiError::ResponseFormat(format!("invalid JSON ({}): {}", e, preview))
    })
}

/// Serialize a request body
pub(crate) fn to_body(value: &Value) -> Result<Vec<u8>, AiError> {
    serde_json::to_vec(value).map_err(|e| AiError::InvalidRequest(format!("body serialization: {}", e)))
}

/// Follow a JSON pointer to a string, or fail with the missing path
pub(crate) fn required_str<'a>(value: &'a Value, pointer: &str) -> Result<&'a str, AiError> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| AiError::ResponseFormat(format!("missing {}", pointer)))
}

pub(crate) fn optional_u64(value: &Value, pointer: &str) -> Option<u64> {
    value.pointer(pointer).and_then(Value::as_u64)
}

/// The API key, or an `InvalidRequest` naming the provider
pub(crate) fn require_api_key<'a>(config: &'a ProviderConfig) -> Result<&'a str, AiError> {
    config
        .credentials
        .as_api_key()
        .ok_or_else(|| AiError::InvalidRequest(format!("no API key configured for {}", config.provider)))
}
