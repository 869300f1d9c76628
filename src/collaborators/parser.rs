//! Parsers turning source files into request items

use std::fs;

use crate::ai::AiRequestItem;
use crate::pipeline::PipelineError;

use super::source::SourceFile;

/// Characters of file content sent to the provider
pub const DEFAULT_MAX_CHARS: usize = 24_000;

/// Parse capability resolved per file by the registry
pub trait Parser: Send + Sync {
    /// Registry key; registering another parser under the same name replaces it
    fn name(&self) -> &str;

    fn supports(&self, file: &SourceFile) -> bool;

    fn parse(&self, file: &SourceFile) -> Result<AiRequestItem, PipelineError>;

    /// Higher wins when several parsers support a file
    fn priority(&self) -> i32 {
        0
    }
}

/// Plain UTF-8 source text
#[derive(Debug, Clone)]
pub struct SourceTextParser {
    max_chars: usize,
}

impl Default for SourceTextParser {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

impl SourceTextParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

impl Parser for SourceTextParser {
    fn name(&self) -> &str {
        "source-text"
    }

    fn supports(&self, file: &SourceFile) -> bool {
        if file.extension().as_deref().and_then(language_for).is_some() {
            return true;
        }
        // Fall back to the MIME table for anything textual
        mime_guess::from_path(&file.path)
            .first()
            .map(|mime| mime.type_() == mime_guess::mime::TEXT)
            .unwrap_or(false)
    }

    fn parse(&self, file: &SourceFile) -> Result<AiRequestItem, PipelineError> {
        let bytes = fs::read(&file.path).map_err(|e| PipelineError::parse(&file.id, e))?;
        let text = String::from_utf8(bytes).map_err(|_| PipelineError::parse(&file.id, "not valid UTF-8"))?;

        let lines = text.lines().count();
        let (content, truncated) = match text.char_indices().nth(self.max_chars) {
            Some((cut, _)) => (text[..cut].to_string(), true),
            None => (text, false),
        };

        let language = file.extension().as_deref().and_then(language_for).unwrap_or("text");
        let mime = mime_guess::from_path(&file.path).first_or_text_plain();

        Ok(AiRequestItem::new(&file.id, content)
            .with_metadata("language", language)
            .with_metadata("lines", lines.to_string())
            .with_metadata("truncated", truncated.to_string())
            .with_metadata("mime", mime.essence_str()))
    }
}

fn language_for(ext: &str) -> Option<&'static str> {
    let lang = match ext {
        "rs" => "rust",
        "py" => "python",
        "js" | "jsx" | "mjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "go" => "go",
        "java" => "java",
        "kt" => "kotlin",
        "scala" => "scala",
        "c" | "h" => "c",
        "cc" | "cpp" | "hpp" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "sh" => "shell",
        "sql" => "sql",
        "toml" => "toml",
        "yaml" | "yml" => "yaml",
        "json" => "json",
        _ => return None,
    };
    Some(lang)
}
