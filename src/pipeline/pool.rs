//! Fixed-size worker pool for the parse and invoke stages

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::debug;

use super::error::PipelineError;

/// At most `size` submitted tasks run at once. Dropping the pool (or
/// calling [`WorkerPool::shutdown`]) aborts everything still outstanding.
pub(crate) struct WorkerPool {
    permits: Arc<Semaphore>,
    tasks: Mutex<Vec<AbortHandle>>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size.max(1))),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn submit<F, T>(&self, task: F) -> JoinHandle<Result<T, PipelineError>>
    where
        F: Future<Output = Result<T, PipelineError>> + Send + 'static,
        T: Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let handle = tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| PipelineError::Worker("worker pool shut down".to_string()))?;
            task.await
        });
        self.track(&handle);
        handle
    }

    /// Run blocking work on the blocking pool while holding a worker slot
    pub fn submit_blocking<F, T>(&self, work: F) -> JoinHandle<Result<T, PipelineError>>
    where
        F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
        T: Send + 'static,
    {
        self.submit(async move {
            tokio::task::spawn_blocking(work)
                .await
                .map_err(|e| PipelineError::Worker(e.to_string()))?
        })
    }

    pub fn shutdown(&self) {
        self.permits.close();
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|e| e.into_inner()));
        let outstanding = tasks.iter().filter(|t| !t.is_finished()).count();
        for task in tasks {
            task.abort();
        }
        debug!(outstanding, "worker pool shut down");
    }

    fn track<T>(&self, handle: &JoinHandle<T>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.retain(|t| !t.is_finished());
        tasks.push(handle.abort_handle());
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.permits.is_closed() {
            self.shutdown();
        }
    }
}

/// Await a pool task, folding join failures into the task's own error
pub(crate) async fn join<T>(handle: JoinHandle<Result<T, PipelineError>>) -> Result<T, PipelineError> {
    match handle.await {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => Err(PipelineError::Worker("task aborted".to_string())),
        Err(e) => Err(PipelineError::Worker(e.to_string())),
    }
}
