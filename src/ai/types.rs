//! Shared types for the AI invocation layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix of the text standing in for a failed call (batch slots, placeholders)
pub const ERROR_MARKER: &str = "[error] ";

/// A unit of work handed to the AI client
///
/// Produced by the parse stage; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiRequestItem {
    /// Opaque file identity (relative path for source files)
    pub file_id: String,
    /// Extracted textual content
    pub content: String,
    /// Free-form metadata (language, line count, ...)
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl AiRequestItem {
    pub fn new(file_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// Token counters as reported by the provider
///
/// Every field is optional; some providers omit some or all of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

impl TokenUsage {
    pub fn new(prompt: Option<u64>, completion: Option<u64>, total: Option<u64>) -> Self {
        // Fill in a missing total when both halves are known
        let total = total.or(match (prompt, completion) {
            (Some(p), Some(c)) => Some(p + c),
            _ => None,
        });
        Self {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: total,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.prompt_tokens.is_none() && self.completion_tokens.is_none() && self.total_tokens.is_none()
    }

    /// Accumulate another usage record into this one
    pub fn add(&mut self, other: &TokenUsage) {
        fn sum(a: Option<u64>, b: Option<u64>) -> Option<u64> {
            match (a, b) {
                (None, None) => None,
                (a, b) => Some(a.unwrap_or(0) + b.unwrap_or(0)),
            }
        }
        self.prompt_tokens = sum(self.prompt_tokens, other.prompt_tokens);
        self.completion_tokens = sum(self.completion_tokens, other.completion_tokens);
        self.total_tokens = sum(self.total_tokens, other.total_tokens);
    }
}

/// Result of one successful AI call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiReply {
    /// Identity of the item this reply answers, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    /// Generated text
    pub text: String,
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub usage: TokenUsage,
    /// Wall-clock latency of the successful attempt
    pub latency_ms: u64,
    pub created_at: DateTime<Utc>,
    /// Set only on placeholder replies standing in for a failed item
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
}

impl AiReply {
    /// Attach the item identity (the client itself only sees prompts)
    pub fn for_item(mut self, file_id: impl Into<String>) -> Self {
        self.file_id = Some(file_id.into());
        self
    }

    /// A stand-in reply for an item that failed, carrying the error text
    pub fn placeholder(file_id: &str, provider: &str, model: &str, error: &str) -> Self {
        Self {
            file_id: Some(file_id.to_string()),
            text: format!("{}{}", ERROR_MARKER, error),
            provider: provider.to_string(),
            model: model.to_string(),
            usage: TokenUsage::default(),
            latency_ms: 0,
            created_at: Utc::now(),
            failed: true,
        }
    }
}
