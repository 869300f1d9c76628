//! Run-level and item-level pipeline failures

use thiserror::Error;

use crate::ai::AiError;

#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// No registered parser supports the file (item-level)
    #[error("no parser found for {0}")]
    NoParserFound(String),

    #[error("no AI provider configured under '{0}'")]
    NoProviderConfigured(String),

    #[error("no result processor configured for '{0}'")]
    NoProcessorConfigured(String),

    #[error("scan failed: {0}")]
    Scan(String),

    #[error("failed to parse {file_id}: {message}")]
    Parse { file_id: String, message: String },

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error("result processor failed: {0}")]
    Processor(String),

    /// An item failure promoted to a run failure by the abort policy
    #[error("item {file_id} failed: {source}")]
    ItemFailed {
        file_id: String,
        #[source]
        source: Box<PipelineError>,
    },

    /// A worker task panicked or was torn down with the pool
    #[error("worker failed: {0}")]
    Worker(String),

    #[error("invalid execution state: {0}")]
    InvalidState(String),
}

impl PipelineError {
    pub fn parse(file_id: impl Into<String>, message: impl ToString) -> Self {
        PipelineError::Parse {
            file_id: file_id.into(),
            message: message.to_string(),
        }
    }

    /// Stable short code carried by failed results
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::NoParserFound(_) => "no_parser_found",
            PipelineError::NoProviderConfigured(_) => "no_provider_configured",
            PipelineError::NoProcessorConfigured(_) => "no_processor_configured",
            PipelineError::Scan(_) => "scan_failed",
            PipelineError::Parse { .. } => "parse_failed",
            PipelineError::Ai(err) => err.classification(),
            PipelineError::Processor(_) => "processor_failed",
            PipelineError::ItemFailed { .. } => "item_failed",
            PipelineError::Worker(_) => "worker_failed",
            PipelineError::InvalidState(_) => "invalid_state",
        }
    }
}
