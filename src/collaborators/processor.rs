//! Aggregate stage: render replies into a report

use serde_json::{json, Value};

use crate::ai::AiReply;
use crate::pipeline::{ExecutionContext, PipelineError};

/// Turns the replies of one execution into the final report payload
pub trait ResultProcessor: Send + Sync {
    /// Processor types this instance is registered under
    fn supported_formats(&self) -> &[&'static str];

    fn process(&self, replies: &[AiReply], context: &ExecutionContext) -> Result<String, PipelineError>;
}

/// Pretty-printed JSON document
#[derive(Debug, Default, Clone)]
pub struct JsonReportProcessor;

impl ResultProcessor for JsonReportProcessor {
    fn supported_formats(&self) -> &[&'static str] {
        &["json"]
    }

    fn process(&self, replies: &[AiReply], context: &ExecutionContext) -> Result<String, PipelineError> {
        let provider = context.provider();
        let report = json!({
            "executionId": context.id(),
            "startedAt": context.started_at(),
            "provider": provider.map(|p| p.provider.as_str()),
            "model": provider.map(|p| p.model.as_str()),
            "metadata": context.metadata_snapshot(),
            "timings": context.durations(),
            "replies": replies,
        });
        serde_json::to_string_pretty(&report).map_err(|e| PipelineError::Processor(e.to_string()))
    }
}

/// Human-readable Markdown report
#[derive(Debug, Default, Clone)]
pub struct MarkdownReportProcessor;

impl ResultProcessor for MarkdownReportProcessor {
    fn supported_formats(&self) -> &[&'static str] {
        &["markdown", "md"]
    }

    fn process(&self, replies: &[AiReply], context: &ExecutionContext) -> Result<String, PipelineError> {
        let mut out = String::from("# Code Review Report\n\n");

        out.push_str(&format!("- Execution: `{}`\n", context.id()));
        out.push_str(&format!("- Started: {}\n", context.started_at().to_rfc3339()));
        if let Some(provider) = context.provider() {
            out.push_str(&format!("- Provider: {} (`{}`)\n", provider.provider, provider.model));
        }

        let metadata = context.metadata_snapshot();
        for key in ["files_scanned", "items_parsed", "items_dropped", "replies"] {
            if let Some(value) = metadata.get(key) {
                out.push_str(&format!("- {}: {}\n", key.replace('_', " "), plain(value)));
            }
        }
        if let Some(tokens) = metadata.get("total_tokens") {
            out.push_str(&format!("- tokens: {}\n", plain(tokens)));
        }

        let timings = context.durations();
        if !timings.is_empty() {
            out.push_str("\n| Stage | ms |\n|---|---|\n");
            for (stage, ms) in &timings {
                out.push_str(&format!("| {} | {} |\n", stage, ms));
            }
        }

        for reply in replies {
            let title = reply.file_id.as_deref().unwrap_or("(unnamed)");
            out.push_str(&format!("\n## {}\n\n", title));
            if reply.failed {
                out.push_str("> review failed\n\n");
            }
            out.push_str(reply.text.trim());
            out.push('\n');
        }

        if replies.is_empty() {
            out.push_str("\n_No files were reviewed._\n");
        }

        Ok(out)
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
