//! OpenAI-compatible chat completions (OpenAI, xAI, DeepSeek, ...)

use serde::{Deserialize, Serialize};

use super::{require_api_key, ProviderAdapter};
use crate::ai::config::ProviderConfig;
use crate::ai::error::AiError;
use crate::ai::http_client::WireRequest;
use crate::ai::types::TokenUsage;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

/// Bearer-auth chat completions adapter
pub struct OpenAiAdapter;

impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn build_request(&self, prompt: &str, config: &ProviderConfig) -> Result<WireRequest, AiError> {
        let api_key = require_api_key(config)?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = config.system_prompt.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let request = ChatRequest {
            model: &config.model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            messages,
        };
        let body = serde_json::to_vec(&request)
            .map_err(|e| AiError::InvalidRequest(format!("body serialization: {}", e)))?;

        Ok(WireRequest::post_json(&config.endpoint, body)
            .with_header("authorization", format!("Bearer {}", api_key)))
    }

    fn parse_response(&self, body: &[u8]) -> Result<(String, TokenUsage), AiError> {
        let response: ChatResponse = serde_json::from_slice(body)
            .map_err(|e| AiError::ResponseFormat(format!("Failed to parse response: {}", e)))?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AiError::ResponseFormat("missing choices[0].message.content".to_string()))?;

        let usage = response
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens, u.total_tokens))
            .unwrap_or_default();

        Ok((text, usage))
    }
}
