//! Google Gemini `generateContent`
//!
//! The API key travels in the query string, not in a header.

use serde_json::json;

use super::{optional_u64, parse_json, require_api_key, required_str, to_body, ProviderAdapter};
use crate::ai::config::ProviderConfig;
use crate::ai::error::AiError;
use crate::ai::http_client::WireRequest;
use crate::ai::types::TokenUsage;

pub struct GoogleAdapter;

impl GoogleAdapter {
    fn url(config: &ProviderConfig, api_key: &str) -> Result<String, AiError> {
        let invalid = || AiError::InvalidRequest(format!("invalid endpoint {}", config.endpoint));
        let mut url = reqwest::Url::parse(&config.endpoint).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push("models")
            .push(&format!("{}:generateContent", config.model));
        url.query_pairs_mut().append_pair("key", api_key);
        Ok(url.into())
    }
}

impl ProviderAdapter for GoogleAdapter {
    fn name(&self) -> &'static str {
        "google"
    }

    fn build_request(&self, prompt: &str, config: &ProviderConfig) -> Result<WireRequest, AiError> {
        let api_key = require_api_key(config)?;

        let mut body = json!({
            "contents": [
                {"role": "user", "parts": [{"text": prompt}]}
            ],
            "generationConfig": {
                "temperature": config.temperature,
                "maxOutputTokens": config.max_tokens
            }
        });
        if let Some(system) = config.system_prompt.as_deref() {
            body["systemInstruction"] = json!({"parts": [{"text": system}]});
        }

        Ok(WireRequest::post_json(Self::url(config, api_key)?, to_body(&body)?))
    }

    fn parse_response(&self, body: &[u8]) -> Result<(String, TokenUsage), AiError> {
        let value = parse_json(body)?;
        let text = required_str(&value, "/candidates/0/content/parts/0/text")?.to_string();

        let usage = TokenUsage::new(
            optional_u64(&value, "/usageMetadata/promptTokenCount"),
            optional_u64(&value, "/usageMetadata/candidatesTokenCount"),
            optional_u64(&value, "/usageMetadata/totalTokenCount"),
        );

        Ok((text, usage))
    }
}
