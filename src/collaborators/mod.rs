//! Default scan, filter, parse and report implementations

pub mod filter;
pub mod parser;
pub mod processor;
pub mod source;

pub use filter::FileFilter;
pub use parser::{Parser, SourceTextParser};
pub use processor::{JsonReportProcessor, MarkdownReportProcessor, ResultProcessor};
pub use source::{FileSource, SourceFile, WalkDirSource};
