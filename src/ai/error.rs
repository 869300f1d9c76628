//! Error taxonomy for provider calls.

use thiserror::Error;

/// Failure of a single AI invocation (or of the client around it)
#[derive(Debug, Clone, Error)]
pub enum AiError {
    /// Network failure, connect/read timeout, or dropped connection
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered 2xx but the body did not have the expected shape
    #[error("unexpected response format: {0}")]
    ResponseFormat(String),

    /// HTTP 429
    #[error("rate limited by provider: {body}")]
    RateLimited { body: String },

    /// HTTP 401 / 403
    #[error("authentication failed (HTTP {status}): {body}")]
    AuthenticationFailed { status: u16, body: String },

    /// Any other non-2xx status
    #[error("request failed (HTTP {status}): {body}")]
    RequestFailed { status: u16, body: String },

    /// The adapter could not build a wire request from the config
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unknown AI provider: {0}")]
    UnknownProvider(String),

    #[error("AI client has been shut down")]
    ClientShutdown,

    /// The worker running the call was aborted or panicked
    #[error("call cancelled: {0}")]
    Cancelled(String),

    /// Terminal failure once every attempt has been used up
    #[error("giving up after {attempts} attempt(s): {last}")]
    RetriesExhausted { attempts: u32, last: Box<AiError> },
}

impl AiError {
    /// Map a non-2xx HTTP status to its classification.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            429 => AiError::RateLimited { body },
            401 | 403 => AiError::AuthenticationFailed { status, body },
            _ => AiError::RequestFailed { status, body },
        }
    }

    /// Stable short label, used in logs and failed pipeline results
    pub fn classification(&self) -> &'static str {
        match self {
            AiError::Transport(_) => "transport_error",
            AiError::ResponseFormat(_) => "response_format_error",
            AiError::RateLimited { .. } => "rate_limited",
            AiError::AuthenticationFailed { .. } => "authentication_failed",
            AiError::RequestFailed { .. } => "request_failed",
            AiError::InvalidRequest(_) => "invalid_request",
            AiError::UnknownProvider(_) => "unknown_provider",
            AiError::ClientShutdown => "client_shutdown",
            AiError::Cancelled(_) => "cancelled",
            AiError::RetriesExhausted { .. } => "retries_exhausted",
        }
    }

    /// The underlying error, looking through `RetriesExhausted`
    pub fn root(&self) -> &AiError {
        match self {
            AiError::RetriesExhausted { last, .. } => last.root(),
            other => other,
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self.root(), AiError::AuthenticationFailed { .. })
    }
}

impl From<AiError> for String {
    fn from(err: AiError) -> Self {
        err.to_string()
    }
}
