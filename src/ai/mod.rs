pub mod client;
pub mod config;
pub mod error;
pub mod http_client;
pub mod prompts;
pub mod providers;
pub mod retry;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::AiClient;
pub use config::{Credentials, ProviderConfig};
pub use error::AiError;
pub use http_client::{HttpTransport, Transport, WireRequest, WireResponse};
pub use providers::{adapter_for, ProviderAdapter};
pub use retry::RetryPolicy;
pub use types::{AiReply, AiRequestItem, TokenUsage, ERROR_MARKER};
