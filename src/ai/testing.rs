//! Test doubles: a scripted transport, stub parsers and a fixed file source

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::config::{Credentials, ProviderConfig};
use super::error::AiError;
use super::http_client::{Transport, WireRequest, WireResponse};
use super::types::AiRequestItem;
use crate::collaborators::{FileSource, Parser, SourceFile};
use crate::pipeline::PipelineError;

type Responder = dyn Fn(&str, usize) -> Result<WireResponse, AiError> + Send + Sync;

/// Answers OpenAI-shaped requests from a closure.
///
/// The closure sees the user prompt and the 1-based attempt number for that
/// prompt. Calls, in-flight calls and the in-flight peak are counted.
pub(crate) struct FakeTransport {
    responder: Box<Responder>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    attempts: Mutex<HashMap<String, usize>>,
}

impl FakeTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, usize) -> Result<WireResponse, AiError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Every call succeeds with "reviewed: <prompt>"
    pub fn echo() -> Self {
        Self::new(|prompt, _| Ok(ok_response(&format!("reviewed: {}", prompt))))
    }

    /// Every call answers with `status`
    pub fn failing(status: u16) -> Self {
        Self::new(move |_, _| Ok(WireResponse::new(status, "scripted failure")))
    }

    /// Each prompt fails `failures` times with a 500, then echoes
    pub fn flaky(failures: usize) -> Self {
        Self::new(move |prompt, attempt| {
            if attempt <= failures {
                Ok(WireResponse::new(500, "transient"))
            } else {
                Ok(ok_response(&format!("reviewed: {}", prompt)))
            }
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn attempts_for(&self, prompt: &str) -> usize {
        self.attempts
            .lock()
            .unwrap()
            .get(prompt)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let prompt = user_prompt(&request.body);
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let n = attempts.entry(prompt.clone()).or_insert(0);
            *n += 1;
            *n
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        (self.responder)(&prompt, attempt)
    }
}

/// A chat-completions body carrying `text`
pub(crate) fn ok_response(text: &str) -> WireResponse {
    let body = json!({
        "choices": [{"message": {"role": "assistant", "content": text}}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    });
    WireResponse::new(200, body.to_string())
}

/// OpenAI config with a dummy key, no system prompt and the given limits
pub(crate) fn test_config(max_concurrency: usize, max_retries: u32, retry_delay_ms: u64) -> ProviderConfig {
    ProviderConfig::for_provider("openai")
        .unwrap()
        .with_credentials(Credentials::api_key("test-key"))
        .with_system_prompt(None)
        .with_concurrency(max_concurrency)
        .with_retries(max_retries, retry_delay_ms)
}

fn user_prompt(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| {
            v["messages"]
                .as_array()
                .and_then(|m| m.last())
                .and_then(|m| m["content"].as_str())
                .map(str::to_string)
        })
        .unwrap_or_default()
}

/// Parser that never touches the filesystem
pub(crate) struct StubParser {
    name: String,
    priority: i32,
    extension: Option<String>,
    fail_on: Vec<String>,
}

impl StubParser {
    pub fn new(name: &str, priority: i32) -> Self {
        Self {
            name: name.to_string(),
            priority,
            extension: None,
            fail_on: Vec::new(),
        }
    }

    /// Support only files with this extension
    pub fn only(mut self, extension: &str) -> Self {
        self.extension = Some(extension.to_string());
        self
    }

    pub fn failing_on(mut self, file_id: &str) -> Self {
        self.fail_on.push(file_id.to_string());
        self
    }
}

impl Parser for StubParser {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, file: &SourceFile) -> bool {
        match &self.extension {
            Some(ext) => file.extension().as_deref() == Some(ext.as_str()),
            None => true,
        }
    }

    fn parse(&self, file: &SourceFile) -> Result<AiRequestItem, PipelineError> {
        if self.fail_on.contains(&file.id) {
            return Err(PipelineError::parse(&file.id, "stub failure"));
        }
        Ok(AiRequestItem::new(&file.id, format!("content of {}", file.id)).with_metadata("parser", &self.name))
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// Source returning a fixed file list
pub(crate) struct StaticSource(pub Vec<SourceFile>);

impl StaticSource {
    /// `n` files named `file1.rs` .. `file<n>.rs`
    pub fn numbered(n: usize) -> Self {
        Self(
            (1..=n)
                .map(|i| SourceFile::new(format!("file{}.rs", i), format!("/virtual/file{}.rs", i), 10))
                .collect(),
        )
    }
}

impl FileSource for StaticSource {
    fn scan(&self, _base: &Path) -> Result<Vec<SourceFile>, PipelineError> {
        Ok(self.0.clone())
    }
}
