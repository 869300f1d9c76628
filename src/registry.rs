//! Capability lookup: file -> parser, provider -> AI client,
//! processor type -> result processor.
//!
//! Built once at startup and passed to the pipeline. Lookups may run
//! concurrently with late registrations.

use dashmap::DashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::ai::AiClient;
use crate::collaborators::{JsonReportProcessor, MarkdownReportProcessor, Parser, ResultProcessor, SourceFile, SourceTextParser};

#[derive(Default)]
pub struct AdapterRegistry {
    /// Insertion order is the tie-break between equal priorities
    parsers: RwLock<Vec<Arc<dyn Parser>>>,
    ai_services: DashMap<String, AiClient>,
    processors: DashMap<String, Arc<dyn ResultProcessor>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source-text parser plus the JSON and Markdown processors
    pub fn with_default_collaborators() -> Self {
        let registry = Self::new();
        registry.register_parser(Arc::new(SourceTextParser::new()));
        registry.register_processor(Arc::new(JsonReportProcessor));
        registry.register_processor(Arc::new(MarkdownReportProcessor));
        registry
    }

    /// Add a parser, replacing any parser with the same name in place
    pub fn register_parser(&self, parser: Arc<dyn Parser>) {
        let mut parsers = self.parsers.write().unwrap_or_else(|e| e.into_inner());
        debug!(parser = parser.name(), priority = parser.priority(), "registering parser");
        match parsers.iter_mut().find(|p| p.name() == parser.name()) {
            Some(slot) => *slot = parser,
            None => parsers.push(parser),
        }
    }

    /// Highest-priority parser supporting `file`; first registered wins ties
    pub fn find_parser(&self, file: &SourceFile) -> Option<Arc<dyn Parser>> {
        let parsers = self.parsers.read().unwrap_or_else(|e| e.into_inner());
        let mut best: Option<&Arc<dyn Parser>> = None;
        for parser in parsers.iter().filter(|p| p.supports(file)) {
            if best.map_or(true, |b| parser.priority() > b.priority()) {
                best = Some(parser);
            }
        }
        best.cloned()
    }

    pub fn register_ai_service(&self, name: impl Into<String>, client: AiClient) {
        let name = name.into();
        debug!(provider = %name, "registering AI service");
        self.ai_services.insert(name, client);
    }

    pub fn find_ai_service(&self, name: &str) -> Option<AiClient> {
        self.ai_services.get(name).map(|entry| entry.value().clone())
    }

    /// Register under every format the processor reports
    pub fn register_processor(&self, processor: Arc<dyn ResultProcessor>) {
        for format in processor.supported_formats() {
            self.register_processor_as(*format, Arc::clone(&processor));
        }
    }

    pub fn register_processor_as(&self, processor_type: impl Into<String>, processor: Arc<dyn ResultProcessor>) {
        let processor_type = processor_type.into();
        debug!(processor = %processor_type, "registering result processor");
        self.processors.insert(processor_type, processor);
    }

    pub fn find_processor(&self, processor_type: &str) -> Option<Arc<dyn ResultProcessor>> {
        self.processors.get(processor_type).map(|entry| Arc::clone(entry.value()))
    }

    pub fn parser_names(&self) -> Vec<String> {
        let parsers = self.parsers.read().unwrap_or_else(|e| e.into_inner());
        parsers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn provider_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.ai_services.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn processor_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.processors.iter().map(|e| e.key().clone()).collect();
        types.sort();
        types
    }
}
