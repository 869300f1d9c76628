//! Per-run pipeline settings

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::collaborators::FileFilter;

/// What the parse and invoke stages do with an item that fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemFailurePolicy {
    /// Log and omit the item; later results shift up
    #[default]
    Drop,
    /// Fail the whole run on the first item failure
    Abort,
    /// Emit a failed reply carrying the error in the item's place
    Placeholder,
}

impl ItemFailurePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "drop" => Some(ItemFailurePolicy::Drop),
            "abort" => Some(ItemFailurePolicy::Abort),
            "placeholder" => Some(ItemFailurePolicy::Placeholder),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub base_path: PathBuf,
    /// Registry key of the AI client
    pub provider: String,
    /// Registry key of the result processor
    pub processor: String,
    /// Worker pool size for the parse and invoke stages
    pub threads: usize,
    pub failure_policy: ItemFailurePolicy,
    pub filter: FileFilter,
    /// Cache replies for this long when a cache is attached
    pub cache_ttl: Option<Duration>,
}

impl PipelineConfig {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            provider: "openai".to_string(),
            processor: "markdown".to_string(),
            threads: num_cpus::get(),
            failure_policy: ItemFailurePolicy::default(),
            filter: FileFilter::source_code(),
            cache_ttl: None,
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_processor(mut self, processor: impl Into<String>) -> Self {
        self.processor = processor.into();
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_failure_policy(mut self, policy: ItemFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_filter(mut self, filter: FileFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn effective_threads(&self) -> usize {
        self.threads.max(1)
    }
}
