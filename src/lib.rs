pub mod ai;
pub mod cache;
pub mod collaborators;
pub mod pipeline;
pub mod registry;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

pub use ai::{AiClient, AiError, AiReply, AiRequestItem, ProviderConfig, RetryPolicy, TokenUsage};
pub use cache::{MemoryCache, ResultCache};
pub use pipeline::{ItemFailurePolicy, Pipeline, PipelineConfig, PipelineError, PipelineResult};
pub use registry::AdapterRegistry;

/// Grace period for in-flight calls when the binary exits
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Install the global subscriber. Safe to call more than once.
pub fn init_tracing() {
    // Default: warn for dependencies, info for this crate (stage summaries)
    // Use RUST_LOG=review_engine=debug for per-call token usage
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,review_engine=info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Environment-driven run over `base_path`, as used by the binary.
///
/// Reads `REVIEW_PROVIDER` (default `openai`), `REVIEW_FORMAT` (default
/// `markdown`), `REVIEW_THREADS` and `REVIEW_ON_ITEM_FAILURE`, plus the
/// provider variables read by [`ProviderConfig::from_env`].
pub async fn run(base_path: PathBuf) -> Result<PipelineResult, PipelineError> {
    // Load .env from the working directory, falling back to its parent
    if dotenvy::dotenv().is_err() {
        let _ = dotenvy::from_path("../.env");
    }
    init_tracing();

    let provider = std::env::var("REVIEW_PROVIDER").unwrap_or_else(|_| "openai".to_string());
    let format = std::env::var("REVIEW_FORMAT").unwrap_or_else(|_| "markdown".to_string());

    let client = AiClient::new(ProviderConfig::from_env(&provider)?)?;
    let registry = AdapterRegistry::with_default_collaborators();
    registry.register_ai_service(provider.clone(), client.clone());

    let mut config = PipelineConfig::new(base_path)
        .with_provider(provider)
        .with_processor(format);
    if let Ok(threads) = std::env::var("REVIEW_THREADS") {
        match threads.parse() {
            Ok(threads) => config = config.with_threads(threads),
            Err(_) => tracing::warn!(value = %threads, "ignoring invalid REVIEW_THREADS"),
        }
    }
    if let Ok(policy) = std::env::var("REVIEW_ON_ITEM_FAILURE") {
        match ItemFailurePolicy::parse(&policy) {
            Some(policy) => config = config.with_failure_policy(policy),
            None => tracing::warn!(value = %policy, "ignoring invalid REVIEW_ON_ITEM_FAILURE"),
        }
    }

    let result = Pipeline::new(Arc::new(registry)).run(&config).await;
    client.shutdown(SHUTDOWN_GRACE).await;
    Ok(result)
}
