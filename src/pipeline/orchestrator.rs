//! Five-stage run: scan -> filter -> parse -> invoke -> aggregate
//!
//! Parse and invoke fan out over a fixed worker pool and are collected in
//! submission order. The invoke stage is gated twice: the pool bounds work
//! items in flight, the client's own semaphore bounds network calls.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::config::{ItemFailurePolicy, PipelineConfig};
use super::context::{ExecutionContext, ExecutionState};
use super::error::PipelineError;
use super::pool::{join, WorkerPool};
use crate::ai::prompts::build_review_prompt;
use crate::ai::{AiClient, AiReply, AiRequestItem, TokenUsage};
use crate::cache::{cache_key, ResultCache};
use crate::collaborators::{FileSource, SourceFile, WalkDirSource};
use crate::registry::AdapterRegistry;

/// Outcome of one run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub execution_id: String,
    pub state: ExecutionState,
    pub success: bool,
    /// Successful replies in submission order (plus placeholders, if enabled)
    pub replies: Vec<AiReply>,
    pub report: Option<String>,
    pub error: Option<String>,
    pub error_code: Option<String>,
    pub timings: BTreeMap<String, u64>,
    pub token_usage: TokenUsage,
    pub metadata: BTreeMap<String, Value>,
}

impl PipelineResult {
    fn completed(ctx: &ExecutionContext, replies: Vec<AiReply>, report: String, token_usage: TokenUsage) -> Self {
        Self {
            execution_id: ctx.id().to_string(),
            state: ctx.state(),
            success: true,
            replies,
            report: Some(report),
            error: None,
            error_code: None,
            timings: ctx.durations(),
            token_usage,
            metadata: ctx.metadata_snapshot(),
        }
    }

    fn failed(ctx: &ExecutionContext, err: &PipelineError) -> Self {
        Self {
            execution_id: ctx.id().to_string(),
            state: ctx.state(),
            success: false,
            replies: Vec::new(),
            report: None,
            error: Some(err.to_string()),
            error_code: Some(err.code().to_string()),
            timings: ctx.durations(),
            token_usage: TokenUsage::default(),
            metadata: ctx.metadata_snapshot(),
        }
    }
}

/// Parse-stage output
enum Parsed {
    Item(AiRequestItem),
    /// Kept only under the placeholder policy
    Failed { file_id: String, error: String },
}

/// Invoke-stage work in submission order
enum Pending {
    Ready(AiReply),
    Running(String, tokio::task::JoinHandle<Result<AiReply, PipelineError>>),
}

pub struct Pipeline {
    registry: Arc<AdapterRegistry>,
    source: Arc<dyn FileSource>,
    cache: Option<Arc<dyn ResultCache>>,
}

impl Pipeline {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self {
            registry,
            source: Arc::new(WalkDirSource::new()),
            cache: None,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn FileSource>) -> Self {
        self.source = source;
        self
    }

    /// Consulted by the invoke stage when the run sets a cache TTL
    pub fn with_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Run one execution. Never panics on collaborator failure; run-level
    /// errors come back as a failed result.
    pub async fn run(&self, config: &PipelineConfig) -> PipelineResult {
        let mut ctx = ExecutionContext::new();
        if let Err(err) = ctx.transition(ExecutionState::Running) {
            return PipelineResult::failed(&ctx, &err);
        }

        info!(
            execution_id = ctx.id(),
            base_path = %config.base_path.display(),
            provider = %config.provider,
            processor = %config.processor,
            threads = config.effective_threads(),
            policy = ?config.failure_policy,
            "pipeline started"
        );

        let started = Instant::now();
        let pool = WorkerPool::new(config.effective_threads());
        let outcome = self.execute(&mut ctx, config, &pool).await;
        pool.shutdown();
        ctx.record_duration("total", started.elapsed());

        let outcome = outcome.and_then(|done| {
            ctx.transition(ExecutionState::Completed)?;
            Ok(done)
        });

        match outcome {
            Ok((replies, report, usage)) => {
                info!(
                    execution_id = ctx.id(),
                    replies = replies.len(),
                    dropped = ctx.metadata("items_dropped").and_then(|v| v.as_u64()).unwrap_or(0),
                    total_tokens = ?usage.total_tokens,
                    total_ms = ctx.duration_ms("total_ms").unwrap_or(0),
                    "pipeline completed"
                );
                PipelineResult::completed(&ctx, replies, report, usage)
            }
            Err(err) => {
                if ctx.state() == ExecutionState::Running {
                    let _ = ctx.transition(ExecutionState::Failed);
                }
                error!(execution_id = ctx.id(), code = err.code(), error = %err, "pipeline failed");
                PipelineResult::failed(&ctx, &err)
            }
        }
    }

    async fn execute(
        &self,
        ctx: &mut ExecutionContext,
        config: &PipelineConfig,
        pool: &WorkerPool,
    ) -> Result<(Vec<AiReply>, String, TokenUsage), PipelineError> {
        // Scan
        let started = Instant::now();
        let source = Arc::clone(&self.source);
        let base = config.base_path.clone();
        let files = tokio::task::spawn_blocking(move || source.scan(&base))
            .await
            .map_err(|e| PipelineError::Worker(e.to_string()))??;
        ctx.record_duration("scan", started.elapsed());
        ctx.set_metadata("files_scanned", files.len());

        // Filter
        let started = Instant::now();
        let files = config.filter.apply(files);
        ctx.record_duration("filter", started.elapsed());
        ctx.set_metadata("files_filtered", files.len());
        info!(
            execution_id = ctx.id(),
            scanned = ctx.metadata("files_scanned").and_then(|v| v.as_u64()).unwrap_or(0),
            kept = files.len(),
            "scan complete"
        );

        // Parse
        let started = Instant::now();
        let (parsed, parse_dropped) = self.parse_stage(files, config.failure_policy, pool, ctx).await?;
        ctx.record_duration("parse", started.elapsed());
        let items_parsed = parsed.iter().filter(|p| matches!(p, Parsed::Item(_))).count();
        ctx.set_metadata("items_parsed", items_parsed);
        info!(execution_id = ctx.id(), items = items_parsed, dropped = parse_dropped, "parse stage complete");

        // Invoke
        let client = self
            .registry
            .find_ai_service(&config.provider)
            .ok_or_else(|| PipelineError::NoProviderConfigured(config.provider.clone()))?;
        ctx.set_provider(client.config().clone());

        let started = Instant::now();
        let (replies, invoke_dropped) = self.invoke_stage(&client, parsed, config, pool, ctx).await?;
        ctx.record_duration("invoke", started.elapsed());
        ctx.set_metadata("items_dropped", parse_dropped + invoke_dropped);
        ctx.set_metadata("replies", replies.len());
        info!(execution_id = ctx.id(), replies = replies.len(), dropped = invoke_dropped, "invoke stage complete");

        // Aggregate
        let started = Instant::now();
        let processor = self
            .registry
            .find_processor(&config.processor)
            .ok_or_else(|| PipelineError::NoProcessorConfigured(config.processor.clone()))?;

        let mut usage = TokenUsage::default();
        for reply in &replies {
            usage.add(&reply.usage);
        }
        if let Some(total) = usage.total_tokens {
            ctx.set_metadata("total_tokens", total);
        }

        let report = processor.process(&replies, ctx)?;
        ctx.record_duration("aggregate", started.elapsed());

        Ok((replies, report, usage))
    }

    async fn parse_stage(
        &self,
        files: Vec<SourceFile>,
        policy: ItemFailurePolicy,
        pool: &WorkerPool,
        ctx: &ExecutionContext,
    ) -> Result<(Vec<Parsed>, usize), PipelineError> {
        let handles: Vec<_> = files
            .into_iter()
            .map(|file| {
                let registry = Arc::clone(&self.registry);
                let file_id = file.id.clone();
                let handle = pool.submit_blocking(move || {
                    let parser = registry
                        .find_parser(&file)
                        .ok_or_else(|| PipelineError::NoParserFound(file.id.clone()))?;
                    parser.parse(&file)
                });
                (file_id, handle)
            })
            .collect();

        let mut parsed = Vec::with_capacity(handles.len());
        let mut dropped = 0;
        for (file_id, handle) in handles {
            match join(handle).await {
                Ok(item) => parsed.push(Parsed::Item(item)),
                Err(err) => match on_item_failure(policy, "parse", ctx.id(), &file_id, err)? {
                    Some(error) => parsed.push(Parsed::Failed { file_id, error }),
                    None => dropped += 1,
                },
            }
        }
        Ok((parsed, dropped))
    }

    async fn invoke_stage(
        &self,
        client: &AiClient,
        parsed: Vec<Parsed>,
        config: &PipelineConfig,
        pool: &WorkerPool,
        ctx: &ExecutionContext,
    ) -> Result<(Vec<AiReply>, usize), PipelineError> {
        let provider = client.provider().to_string();
        let model = client.config().model.clone();
        let cache = self.cache.clone().zip(config.cache_ttl);

        let pending: Vec<Pending> = parsed
            .into_iter()
            .map(|entry| match entry {
                Parsed::Failed { file_id, error } => {
                    Pending::Ready(AiReply::placeholder(&file_id, &provider, &model, &error))
                }
                Parsed::Item(item) => {
                    let file_id = item.file_id.clone();
                    let handle = pool.submit(invoke_one(client.clone(), cache.clone(), item));
                    Pending::Running(file_id, handle)
                }
            })
            .collect();

        let mut replies = Vec::with_capacity(pending.len());
        let mut dropped = 0;
        for entry in pending {
            match entry {
                Pending::Ready(reply) => replies.push(reply),
                Pending::Running(file_id, handle) => match join(handle).await {
                    Ok(reply) => replies.push(reply),
                    Err(err) => match on_item_failure(config.failure_policy, "invoke", ctx.id(), &file_id, err)? {
                        Some(error) => replies.push(AiReply::placeholder(&file_id, &provider, &model, &error)),
                        None => dropped += 1,
                    },
                },
            }
        }
        Ok((replies, dropped))
    }
}

/// One AI call for one item, short-circuited by the cache when attached
async fn invoke_one(
    client: AiClient,
    cache: Option<(Arc<dyn ResultCache>, Duration)>,
    item: AiRequestItem,
) -> Result<AiReply, PipelineError> {
    let prompt = build_review_prompt(&item);
    let key = cache
        .as_ref()
        .map(|_| cache_key(client.provider(), &client.config().model, &prompt));

    if let (Some((cache, _)), Some(key)) = (&cache, &key) {
        if let Some(hit) = cache.get(key) {
            match serde_json::from_str::<AiReply>(&hit) {
                Ok(mut reply) => {
                    debug!(file_id = %item.file_id, "reply served from cache");
                    reply.usage = TokenUsage::default();
                    reply.latency_ms = 0;
                    return Ok(reply.for_item(&item.file_id));
                }
                Err(e) => warn!(file_id = %item.file_id, error = %e, "discarding unreadable cache entry"),
            }
        }
    }

    // Scoped so that aborting the pool task also cancels the provider call
    let reply = client.analyze_scoped(prompt).await?.for_item(&item.file_id);

    if let (Some((cache, ttl)), Some(key)) = (cache, key) {
        match serde_json::to_string(&reply) {
            Ok(json) => cache.put(&key, json, ttl),
            Err(e) => warn!(file_id = %item.file_id, error = %e, "reply not cached"),
        }
    }

    Ok(reply)
}

/// `Ok(None)`: drop the item. `Ok(Some(msg))`: emit a placeholder.
fn on_item_failure(
    policy: ItemFailurePolicy,
    stage: &str,
    execution_id: &str,
    file_id: &str,
    err: PipelineError,
) -> Result<Option<String>, PipelineError> {
    match policy {
        ItemFailurePolicy::Drop => {
            warn!(execution_id, stage, file_id, code = err.code(), error = %err, "item dropped");
            Ok(None)
        }
        ItemFailurePolicy::Placeholder => {
            warn!(execution_id, stage, file_id, code = err.code(), error = %err, "item failed, placeholder kept");
            Ok(Some(err.to_string()))
        }
        ItemFailurePolicy::Abort => Err(PipelineError::ItemFailed {
            file_id: file_id.to_string(),
            source: Box::new(err),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::http_client::{WireRequest, WireResponse};
    use crate::ai::AiError;
    use async_trait::async_trait;
    use crate::ai::testing::{ok_response, test_config, FakeTransport, StaticSource, StubParser};
    use crate::ai::{Transport, ERROR_MARKER};
    use crate::cache::MemoryCache;
    use crate::collaborators::{FileFilter, JsonReportProcessor, MarkdownReportProcessor};
    use std::fs;
    use tempfile::TempDir;

    fn registry(parser: StubParser, transport: &Arc<FakeTransport>, client_concurrency: usize) -> Arc<AdapterRegistry> {
        let registry = AdapterRegistry::new();
        registry.register_parser(Arc::new(parser));
        registry.register_processor(Arc::new(JsonReportProcessor));
        registry.register_processor(Arc::new(MarkdownReportProcessor));
        let client = AiClient::with_transport(
            test_config(client_concurrency, 0, 1),
            Arc::clone(transport) as Arc<dyn Transport>,
        )
        .unwrap();
        registry.register_ai_service("openai", client);
        Arc::new(registry)
    }

    fn pipeline(registry: Arc<AdapterRegistry>, files: usize) -> Pipeline {
        Pipeline::new(registry).with_source(Arc::new(StaticSource::numbered(files)))
    }

    fn config() -> PipelineConfig {
        PipelineConfig::new("/virtual")
            .with_filter(FileFilter::new())
            .with_threads(4)
    }

    fn ids(result: &PipelineResult) -> Vec<&str> {
        result
            .replies
            .iter()
            .map(|r| r.file_id.as_deref().unwrap_or(""))
            .collect()
    }

    /// Fails every call whose prompt mentions `file_id`
    fn failing_for(file_id: &'static str) -> FakeTransport {
        FakeTransport::new(move |prompt, _| {
            if prompt.contains(&format!("FILE: {}\n", file_id)) {
                Ok(WireResponse::new(500, "provider exploded"))
            } else {
                Ok(ok_response("ok"))
            }
        })
    }

    #[tokio::test]
    async fn test_parse_failure_is_dropped() {
        let transport = Arc::new(FakeTransport::echo());
        let registry = registry(StubParser::new("stub", 0).failing_on("file3.rs"), &transport, 2);

        let result = pipeline(registry, 5).run(&config()).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.state, ExecutionState::Completed);
        assert_eq!(ids(&result), vec!["file1.rs", "file2.rs", "file4.rs", "file5.rs"]);
        assert_eq!(result.metadata["items_parsed"], 4);
        assert_eq!(result.metadata["items_dropped"], 1);
        assert_eq!(transport.calls(), 4);
    }

    #[tokio::test]
    async fn test_invoke_failure_is_dropped() {
        let transport = Arc::new(failing_for("file2.rs"));
        let registry = registry(StubParser::new("stub", 0), &transport, 2);

        let result = pipeline(registry, 3).run(&config()).await;

        assert!(result.success);
        assert_eq!(ids(&result), vec!["file1.rs", "file3.rs"]);
        assert_eq!(result.metadata["items_dropped"], 1);
    }

    #[tokio::test]
    async fn test_abort_policy_fails_run() {
        let transport = Arc::new(FakeTransport::echo());
        let registry = registry(StubParser::new("stub", 0).failing_on("file3.rs"), &transport, 2);
        let config = config().with_failure_policy(ItemFailurePolicy::Abort);

        let result = pipeline(registry, 5).run(&config).await;

        assert!(!result.success);
        assert_eq!(result.state, ExecutionState::Failed);
        assert_eq!(result.error_code.as_deref(), Some("item_failed"));
        assert!(result.error.unwrap().contains("file3.rs"));
        assert!(result.replies.is_empty());
        assert_eq!(transport.calls(), 0);
    }

    /// Fails file1 at once and holds every other call open
    struct StallingTransport;

    #[async_trait]
    impl Transport for StallingTransport {
        async fn send(&self, request: WireRequest) -> Result<WireResponse, AiError> {
            if String::from_utf8_lossy(&request.body).contains("file1.rs") {
                return Ok(WireResponse::new(500, "provider exploded"));
            }
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(ok_response("too late"))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_abort_policy_cancels_outstanding_calls() {
        let client = AiClient::with_transport(test_config(4, 0, 1), Arc::new(StallingTransport)).unwrap();
        let registry = AdapterRegistry::new();
        registry.register_parser(Arc::new(StubParser::new("stub", 0)));
        registry.register_processor(Arc::new(JsonReportProcessor));
        registry.register_ai_service("openai", client.clone());
        let config = config().with_processor("json").with_failure_policy(ItemFailurePolicy::Abort);

        let result = pipeline(Arc::new(registry), 4).run(&config).await;
        assert_eq!(result.error_code.as_deref(), Some("item_failed"));

        let drained = tokio::time::timeout(Duration::from_secs(2), async {
            while client.pending_tasks() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(drained.is_ok(), "{} calls still running", client.pending_tasks());
    }

    #[tokio::test]
    async fn test_placeholder_policy_keeps_positions() {
        let transport = Arc::new(failing_for("file4.rs"));
        let registry = registry(StubParser::new("stub", 0).failing_on("file2.rs"), &transport, 2);
        let config = config().with_failure_policy(ItemFailurePolicy::Placeholder);

        let result = pipeline(registry, 5).run(&config).await;

        assert!(result.success);
        assert_eq!(ids(&result), vec!["file1.rs", "file2.rs", "file3.rs", "file4.rs", "file5.rs"]);
        let failed: Vec<bool> = result.replies.iter().map(|r| r.failed).collect();
        assert_eq!(failed, vec![false, true, false, true, false]);
        assert!(result.replies[1].text.starts_with(ERROR_MARKER));
        assert!(result.replies[1].text.contains("stub failure"));
        assert!(result.replies[3].text.contains("500"));
        assert_eq!(result.metadata["items_dropped"], 0);
    }

    #[tokio::test]
    async fn test_missing_provider_fails_with_execution_id() {
        let transport = Arc::new(FakeTransport::echo());
        let registry = registry(StubParser::new("stub", 0), &transport, 2);

        let result = pipeline(registry, 2).run(&config().with_provider("anthropic")).await;

        assert!(!result.success);
        assert_eq!(result.state, ExecutionState::Failed);
        assert!(!result.execution_id.is_empty());
        assert_eq!(result.error_code.as_deref(), Some("no_provider_configured"));
        assert!(result.error.unwrap().contains("anthropic"));
        assert!(result.report.is_none());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_processor_fails_run() {
        let transport = Arc::new(FakeTransport::echo());
        let registry = registry(StubParser::new("stub", 0), &transport, 2);

        let result = pipeline(registry, 2).run(&config().with_processor("html")).await;

        assert!(!result.success);
        assert_eq!(result.error_code.as_deref(), Some("no_processor_configured"));
    }

    #[tokio::test]
    async fn test_no_parser_is_item_level() {
        let transport = Arc::new(FakeTransport::echo());
        let registry = registry(StubParser::new("python", 0).only("py"), &transport, 2);

        let result = pipeline(registry, 3).run(&config()).await;

        assert!(result.success);
        assert!(result.replies.is_empty());
        assert_eq!(result.metadata["items_dropped"], 3);
    }

    #[tokio::test]
    async fn test_timings_usage_and_report() {
        let transport = Arc::new(FakeTransport::echo());
        let registry = registry(StubParser::new("stub", 0), &transport, 2);

        let result = pipeline(registry, 3).run(&config().with_processor("json")).await;

        for key in ["scan_ms", "filter_ms", "parse_ms", "invoke_ms", "aggregate_ms", "total_ms"] {
            assert!(result.timings.contains_key(key), "missing {}", key);
        }
        assert_eq!(result.token_usage.total_tokens, Some(45));

        let report: Value = serde_json::from_str(result.report.as_deref().unwrap()).unwrap();
        assert_eq!(report["executionId"], result.execution_id.as_str());
        assert_eq!(report["replies"].as_array().unwrap().len(), 3);
        assert_eq!(report["metadata"]["total_tokens"], 45);
        assert!(report["timings"]["invoke_ms"].is_u64());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_client_gate_applies_inside_pool() {
        let transport = Arc::new(FakeTransport::echo().with_delay(Duration::from_millis(20)));
        let registry = registry(StubParser::new("stub", 0), &transport, 2);

        let result = pipeline(registry, 10).run(&config().with_threads(8)).await;

        assert_eq!(result.replies.len(), 10);
        assert!(transport.peak() <= 2, "peak was {}", transport.peak());
    }

    #[tokio::test]
    async fn test_cache_hits_skip_the_provider() {
        let transport = Arc::new(FakeTransport::echo());
        let registry = registry(StubParser::new("stub", 0), &transport, 2);
        let pipeline = pipeline(registry, 3).with_cache(Arc::new(MemoryCache::new()));
        let config = config().with_cache_ttl(Duration::from_secs(60));

        let first = pipeline.run(&config).await;
        assert_eq!(transport.calls(), 3);

        let second = pipeline.run(&config).await;
        assert_eq!(transport.calls(), 3);
        assert_eq!(ids(&second), ids(&first));
        assert_eq!(second.replies[0].text, first.replies[0].text);
        assert_eq!(second.token_usage.total_tokens, None);
    }

    #[tokio::test]
    async fn test_cache_unused_without_ttl() {
        let transport = Arc::new(FakeTransport::echo());
        let registry = registry(StubParser::new("stub", 0), &transport, 2);
        let pipeline = pipeline(registry, 2).with_cache(Arc::new(MemoryCache::new()));

        pipeline.run(&config()).await;
        pipeline.run(&config()).await;
        assert_eq!(transport.calls(), 4);
    }

    #[tokio::test]
    async fn test_end_to_end_over_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.rs"), "fn a() {}\n").unwrap();
        fs::write(dir.path().join("b.py"), "def b():\n    pass\n").unwrap();
        fs::write(dir.path().join("logo.png"), [0x89, 0x50, 0x4e, 0x47]).unwrap();

        let transport = Arc::new(FakeTransport::echo());
        let registry = AdapterRegistry::with_default_collaborators();
        let client = AiClient::with_transport(test_config(2, 0, 1), transport.clone() as Arc<dyn Transport>).unwrap();
        registry.register_ai_service("openai", client);

        let result = Pipeline::new(Arc::new(registry))
            .run(&PipelineConfig::new(dir.path()).with_threads(2))
            .await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(ids(&result), vec!["a.rs", "b.py"]);
        assert!(result.replies[0].text.contains("LANGUAGE: rust"));
        assert_eq!(result.metadata["files_scanned"], 3);
        assert_eq!(result.metadata["files_filtered"], 2);

        let report = result.report.unwrap();
        assert!(report.contains("## a.rs"));
        assert!(report.contains("## b.py"));
    }

    #[tokio::test]
    async fn test_scan_failure_fails_run() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(FakeTransport::echo());
        let registry = registry(StubParser::new("stub", 0), &transport, 2);

        let result = Pipeline::new(registry)
            .run(&PipelineConfig::new(dir.path().join("missing")))
            .await;

        assert!(!result.success);
        assert_eq!(result.error_code.as_deref(), Some("scan_failed"));
    }

    #[tokio::test]
    async fn test_empty_tree_completes() {
        let transport = Arc::new(FakeTransport::echo());
        let registry = registry(StubParser::new("stub", 0), &transport, 2);

        let result = pipeline(registry, 0).run(&config()).await;

        assert!(result.success);
        assert!(result.replies.is_empty());
        assert!(result.report.unwrap().contains("No files were reviewed"));
    }
}
