//! Provider configuration
//!
//! One immutable `ProviderConfig` per provider, supplied when the client is
//! constructed. Values come from per-provider defaults, optionally
//! overridden from the environment (`.env` is loaded via dotenvy).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::error::AiError;
use super::prompts::REVIEW_SYSTEM_PROMPT;

pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_MAX_TOKENS: u32 = 4000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Credential material for a provider
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Credentials {
    None,
    /// Bearer token, `x-api-key` header or `?key=` query depending on vendor
    ApiKey { key: String },
    /// AWS access keys, used for SigV4 request signing
    Aws {
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
        region: String,
    },
}

impl Credentials {
    pub fn api_key(key: impl Into<String>) -> Self {
        Credentials::ApiKey { key: key.into() }
    }

    pub fn as_api_key(&self) -> Option<&str> {
        match self {
            Credentials::ApiKey { key } => Some(key.as_str()),
            _ => None,
        }
    }
}

// Keys must never reach the logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::None => write!(f, "None"),
            Credentials::ApiKey { .. } => write!(f, "ApiKey(<redacted>)"),
            Credentials::Aws { region, .. } => write!(f, "Aws(<redacted>, region={})", region),
        }
    }
}

/// Per-provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Provider name, used for adapter selection and registry lookups
    pub provider: String,
    /// Endpoint URL (full URL, or base URL for vendors that put the model in the path)
    pub endpoint: String,
    pub credentials: Credentials,
    /// Model identifier (for Bedrock, a model id or ARN)
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Per-call timeout, enforced by the transport
    pub timeout_secs: u64,
    /// Ceiling on simultaneous outbound calls
    pub max_concurrency: usize,
    /// Additional attempts after the first one
    pub max_retries: u32,
    /// Linear backoff base: retry `n` waits `retry_delay_ms * n`
    pub retry_delay_ms: u64,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl ProviderConfig {
    /// Defaults for a known provider name
    pub fn for_provider(provider: &str) -> Result<Self, AiError> {
        let name = provider.to_lowercase();
        let (endpoint, model) = match name.as_str() {
            "openai" | "openai-compatible" => {
                ("https://api.openai.com/v1/chat/completions", "gpt-4o-mini")
            }
            "xai" | "grok" => ("https://api.x.ai/v1/chat/completions", "grok-4-1-fast"),
            "deepseek" => ("https://api.deepseek.com/chat/completions", "deepseek-chat"),
            "anthropic" | "claude" => ("https://api.anthropic.com/v1/messages", "claude-sonnet-4-5"),
            "google" | "gemini" => (
                "https://generativelanguage.googleapis.com/v1beta",
                "gemini-2.5-flash",
            ),
            "bedrock" | "aws" => (
                "https://bedrock-runtime.us-east-1.amazonaws.com",
                "anthropic.claude-3-5-sonnet-20240620-v1:0",
            ),
            _ => return Err(AiError::UnknownProvider(provider.to_string())),
        };

        Ok(Self {
            provider: name,
            endpoint: endpoint.to_string(),
            credentials: Credentials::None,
            model: model.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            system_prompt: Some(REVIEW_SYSTEM_PROMPT.to_string()),
        })
    }

    /// Defaults overridden from the environment
    ///
    /// Reads `<NAME>_API_KEY`, `<NAME>_MODEL`, `<NAME>_ENDPOINT` and the shared
    /// `AI_*` tuning variables. Bedrock uses the standard AWS variables.
    pub fn from_env(provider: &str) -> Result<Self, AiError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(provider, |key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an injectable lookup (tests use a map)
    pub fn from_lookup<F>(provider: &str, lookup: F) -> Result<Self, AiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::for_provider(provider)?;
        let prefix = env_prefix(&config.provider);

        if let Some(model) = lookup(&format!("{}_MODEL", prefix)) {
            config.model = model;
        }
        if let Some(endpoint) = lookup(&format!("{}_ENDPOINT", prefix)) {
            config.endpoint = endpoint;
        }

        if matches!(config.provider.as_str(), "bedrock" | "aws") {
            let region = lookup("AWS_REGION")
                .or_else(|| lookup("AWS_DEFAULT_REGION"))
                .unwrap_or_else(|| "us-east-1".to_string());
            if lookup(&format!("{}_ENDPOINT", prefix)).is_none() {
                config.endpoint = format!("https://bedrock-runtime.{}.amazonaws.com", region);
            }
            config.credentials = match (
                lookup("AWS_BEARER_TOKEN_BEDROCK"),
                lookup("AWS_ACCESS_KEY_ID"),
                lookup("AWS_SECRET_ACCESS_KEY"),
            ) {
                (Some(token), _, _) => Credentials::api_key(token),
                (None, Some(access_key_id), Some(secret_access_key)) => Credentials::Aws {
                    access_key_id,
                    secret_access_key,
                    session_token: lookup("AWS_SESSION_TOKEN"),
                    region,
                },
                _ => Credentials::None,
            };
        } else if let Some(key) = lookup(&format!("{}_API_KEY", prefix)) {
            config.credentials = Credentials::api_key(key);
        }

        if let Some(v) = parse_var(&lookup, "AI_TEMPERATURE")? {
            config.temperature = v;
        }
        if let Some(v) = parse_var(&lookup, "AI_MAX_TOKENS")? {
            config.max_tokens = v;
        }
        if let Some(v) = parse_var(&lookup, "AI_TIMEOUT_SECS")? {
            config.timeout_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "AI_MAX_CONCURRENCY")? {
            config.max_concurrency = v;
        }
        if let Some(v) = parse_var(&lookup, "AI_MAX_RETRIES")? {
            config.max_retries = v;
        }
        if let Some(v) = parse_var(&lookup, "AI_RETRY_DELAY_MS")? {
            config.retry_delay_ms = v;
        }

        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Semaphore size; a zero ceiling would deadlock every call
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

fn env_prefix(provider: &str) -> String {
    match provider {
        "claude" => "ANTHROPIC".to_string(),
        "gemini" => "GOOGLE".to_string(),
        "grok" => "XAI".to_string(),
        "aws" => "BEDROCK".to_string(),
        "openai-compatible" => "OPENAI".to_string(),
        other => other.to_uppercase().replace('-', "_"),
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, AiError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AiError::InvalidRequest(format!("{} = {:?}: {}", key, raw, e))),
    }
}
