//! Per-execution state

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use super::error::PipelineError;
use crate::ai::ProviderConfig;

/// Lifecycle of one execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    Created,
    Running,
    Completed,
    Failed,
}

impl ExecutionState {
    pub fn can_transition_to(self, next: ExecutionState) -> bool {
        matches!(
            (self, next),
            (ExecutionState::Created, ExecutionState::Running)
                | (ExecutionState::Running, ExecutionState::Completed)
                | (ExecutionState::Running, ExecutionState::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionState::Completed | ExecutionState::Failed)
    }
}

/// Owned by the orchestrator for one run.
///
/// Durations and metadata live in concurrent maps so stage workers can
/// record values through a shared reference.
#[derive(Debug)]
pub struct ExecutionContext {
    execution_id: String,
    state: ExecutionState,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    provider: Option<ProviderConfig>,
    durations: DashMap<String, u64>,
    metadata: DashMap<String, Value>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self {
            execution_id: uuid::Uuid::new_v4().to_string(),
            state: ExecutionState::Created,
            started_at: Utc::now(),
            ended_at: None,
            provider: None,
            durations: DashMap::new(),
            metadata: DashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.execution_id
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Move to `next`; entering a terminal state stamps the end time
    pub fn transition(&mut self, next: ExecutionState) -> Result<(), PipelineError> {
        if !self.state.can_transition_to(next) {
            return Err(PipelineError::InvalidState(format!("{:?} -> {:?}", self.state, next)));
        }
        self.state = next;
        if next.is_terminal() {
            self.ended_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn provider(&self) -> Option<&ProviderConfig> {
        self.provider.as_ref()
    }

    pub fn set_provider(&mut self, config: ProviderConfig) {
        self.provider = Some(config);
    }

    /// Stored as `<stage>_ms`
    pub fn record_duration(&self, stage: &str, elapsed: Duration) {
        self.durations
            .insert(format!("{}_ms", stage), elapsed.as_millis() as u64);
    }

    pub fn duration_ms(&self, key: &str) -> Option<u64> {
        self.durations.get(key).map(|v| *v)
    }

    pub fn durations(&self) -> BTreeMap<String, u64> {
        self.durations
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect()
    }

    pub fn set_metadata(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn metadata(&self, key: &str) -> Option<Value> {
        self.metadata.get(key).map(|v| v.value().clone())
    }

    pub fn metadata_snapshot(&self) -> BTreeMap<String, Value> {
        self.metadata
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }
}
