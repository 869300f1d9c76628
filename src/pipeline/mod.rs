pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
mod pool;

pub use config::{ItemFailurePolicy, PipelineConfig};
pub use context::{ExecutionContext, ExecutionState};
pub use error::PipelineError;
pub use orchestrator::{Pipeline, PipelineResult};
