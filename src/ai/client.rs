//! Bounded AI client
//!
//! Every call runs as a tokio task gated by a semaphore sized to
//! `max_concurrency`. A permit is held for the whole call including
//! backoff sleeps, so at most `max_concurrency` calls are in flight at once.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use futures::future::{self, BoxFuture, FutureExt};
use tokio::runtime::Handle;
use tokio::sync::{Notify, Semaphore};
use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tracing::{debug, info, warn};

use super::config::ProviderConfig;
use super::error::AiError;
use super::http_client::{HttpTransport, Transport};
use super::providers::{adapter_for, ProviderAdapter};
use super::retry::RetryPolicy;
use super::types::{AiReply, ERROR_MARKER};

/// Cheap to clone; clones share the permit pool and task set.
#[derive(Clone)]
pub struct AiClient {
    inner: Arc<ClientInner>,
    runtime: Handle,
}

struct ClientInner {
    config: ProviderConfig,
    adapter: Box<dyn ProviderAdapter>,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    permits: Semaphore,
    active: AtomicUsize,
    pending: AtomicUsize,
    drained: Notify,
    shutdown: AtomicBool,
    tasks: DashMap<u64, AbortHandle>,
    next_task: AtomicU64,
}

impl AiClient {
    /// Build a client talking HTTP to the configured provider.
    ///
    /// Must be called from within a tokio runtime; calls are spawned onto it.
    pub fn new(config: ProviderConfig) -> Result<Self, AiError> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: ProviderConfig, transport: Arc<dyn Transport>) -> Result<Self, AiError> {
        let retry = RetryPolicy::from_config(&config);
        Self::with_policy(config, transport, retry)
    }

    pub fn with_policy(
        config: ProviderConfig,
        transport: Arc<dyn Transport>,
        retry: RetryPolicy,
    ) -> Result<Self, AiError> {
        let runtime = Handle::try_current()
            .map_err(|_| AiError::InvalidRequest("AI client must be created inside a tokio runtime".to_string()))?;
        let adapter = adapter_for(&config)?;
        let permits = Semaphore::new(config.effective_concurrency());

        info!(
            provider = %config.provider,
            model = %config.model,
            max_concurrency = config.effective_concurrency(),
            max_retries = retry.max_retries,
            "AI client ready"
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                adapter,
                transport,
                retry,
                permits,
                active: AtomicUsize::new(0),
                pending: AtomicUsize::new(0),
                drained: Notify::new(),
                shutdown: AtomicBool::new(false),
                tasks: DashMap::new(),
                next_task: AtomicU64::new(0),
            }),
            runtime,
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.inner.config
    }

    pub fn provider(&self) -> &str {
        &self.inner.config.provider
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.inner.retry
    }

    /// Calls currently holding a permit
    pub fn active_requests(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Submitted calls that have not finished, queued ones included
    pub fn pending_tasks(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::SeqCst)
    }

    /// Blocking call.
    ///
    /// Parks the calling thread until the spawned call finishes. Do not call
    /// this from inside an async task; use [`AiClient::analyze_async`] there.
    pub fn analyze(&self, prompt: impl Into<String>) -> Result<AiReply, AiError> {
        futures::executor::block_on(self.analyze_async(prompt))
    }

    /// Submit one call. The work starts immediately, whether or not the
    /// returned future is polled.
    pub fn analyze_async(&self, prompt: impl Into<String>) -> BoxFuture<'static, Result<AiReply, AiError>> {
        match self.submit(prompt.into()) {
            Ok(handle) => async move { settle(handle.await) }.boxed(),
            Err(err) => future::ready(Err(err)).boxed(),
        }
    }

    /// Like [`AiClient::analyze_async`], but dropping the returned future
    /// aborts the call.
    pub fn analyze_scoped(&self, prompt: impl Into<String>) -> BoxFuture<'static, Result<AiReply, AiError>> {
        match self.submit(prompt.into()) {
            Ok(handle) => {
                let abort = AbortOnDrop(handle.abort_handle());
                async move {
                    let _abort = abort;
                    settle(handle.await)
                }
                .boxed()
            }
            Err(err) => future::ready(Err(err)).boxed(),
        }
    }

    fn submit(&self, prompt: String) -> Result<JoinHandle<Result<AiReply, AiError>>, AiError> {
        let task_id = self.inner.next_task.fetch_add(1, Ordering::Relaxed);
        // Counted before the flag check so a concurrent shutdown waits for it
        let guard = PendingGuard::new(Arc::clone(&self.inner), task_id);
        if self.is_shutdown() {
            return Err(AiError::ClientShutdown);
        }

        let finished = Arc::clone(&guard.finished);
        let inner = Arc::clone(&self.inner);
        let handle = self.runtime.spawn(async move {
            let _guard = guard;
            inner.call_with_retry(&prompt).await
        });
        self.inner.tasks.insert(task_id, handle.abort_handle());
        if finished.load(Ordering::SeqCst) {
            self.inner.tasks.remove(&task_id);
        }
        Ok(handle)
    }

    /// Submit every prompt and wait for all of them.
    ///
    /// The output has one entry per prompt, in input order. A failed call
    /// leaves `"[error] <message>"` at its index.
    pub fn analyze_batch_async(&self, prompts: Vec<String>) -> BoxFuture<'static, Vec<String>> {
        let calls: Vec<_> = prompts.into_iter().map(|p| self.analyze_async(p)).collect();

        async move {
            future::join_all(calls)
                .await
                .into_iter()
                .map(|result| match result {
                    Ok(reply) => reply.text,
                    Err(e) => format!("{}{}", ERROR_MARKER, e),
                })
                .collect()
        }
        .boxed()
    }

    /// Stop accepting calls, wait up to `grace` for in-flight ones, then
    /// abort whatever is left. Returns the number of aborted calls.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        if self.inner.shutdown.swap(true, Ordering::SeqCst) {
            debug!("AI client already shut down");
        }

        if tokio::time::timeout(grace, self.wait_drained()).await.is_ok() {
            info!(provider = %self.provider(), "AI client drained");
            return 0;
        }

        // Queued calls fail fast instead of taking a permit
        self.inner.permits.close();

        let ids: Vec<u64> = self.inner.tasks.iter().map(|entry| *entry.key()).collect();
        let mut aborted = 0;
        for id in ids {
            if let Some((_, handle)) = self.inner.tasks.remove(&id) {
                if !handle.is_finished() {
                    handle.abort();
                    aborted += 1;
                }
            }
        }

        warn!(
            provider = %self.provider(),
            aborted,
            grace_ms = grace.as_millis() as u64,
            "AI client forced shutdown"
        );
        aborted
    }

    async fn wait_drained(&self) {
        loop {
            let notified = self.inner.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.inner.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl ClientInner {
    async fn call_with_retry(&self, prompt: &str) -> Result<AiReply, AiError> {
        let _permit = self.permits.acquire().await.map_err(|_| AiError::ClientShutdown)?;
        let _active = ActiveCall::enter(&self.active);

        let max_attempts = self.retry.max_attempts();
        let mut attempt = 1;
        loop {
            match self.attempt(prompt).await {
                Ok(reply) => return Ok(reply),
                Err(err) => {
                    if attempt >= max_attempts || !self.retry.should_retry(&err) {
                        warn!(
                            provider = %self.config.provider,
                            attempts = attempt,
                            class = err.classification(),
                            error = %err,
                            "AI call failed"
                        );
                        return Err(AiError::RetriesExhausted {
                            attempts: attempt,
                            last: Box::new(err),
                        });
                    }

                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        provider = %self.config.provider,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        class = err.classification(),
                        error = %err,
                        "AI call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(&self, prompt: &str) -> Result<AiReply, AiError> {
        let request = self.adapter.build_request(prompt, &self.config)?;
        let started = Instant::now();

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(AiError::from_status(response.status, response.body_text()));
        }

        let (text, usage) = self.adapter.parse_response(&response.body)?;
        let latency_ms = started.elapsed().as_millis() as u64;

        debug!(
            provider = %self.config.provider,
            model = %self.config.model,
            prompt_tokens = ?usage.prompt_tokens,
            completion_tokens = ?usage.completion_tokens,
            total_tokens = ?usage.total_tokens,
            latency_ms,
            "AI call succeeded"
        );

        Ok(AiReply {
            file_id: None,
            text,
            provider: self.config.provider.clone(),
            model: self.config.model.clone(),
            usage,
            latency_ms,
            created_at: Utc::now(),
            failed: false,
        })
    }
}

/// Counts a submitted call until its task finishes or is dropped
struct PendingGuard {
    inner: Arc<ClientInner>,
    task_id: u64,
    finished: Arc<AtomicBool>,
}

impl PendingGuard {
    fn new(inner: Arc<ClientInner>, task_id: u64) -> Self {
        inner.pending.fetch_add(1, Ordering::SeqCst);
        Self {
            inner,
            task_id,
            finished: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        // Set before the removal; `submit` re-checks it after inserting
        self.finished.store(true, Ordering::SeqCst);
        self.inner.tasks.remove(&self.task_id);
        if self.inner.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.drained.notify_waiters();
        }
    }
}

struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn settle(joined: Result<Result<AiReply, AiError>, JoinError>) -> Result<AiReply, AiError> {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => Err(AiError::Cancelled("call aborted".to_string())),
        Err(e) => Err(AiError::Cancelled(format!("worker panicked: {}", e))),
    }
}

struct ActiveCall<'a>(&'a AtomicUsize);

impl<'a> ActiveCall<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for ActiveCall<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
