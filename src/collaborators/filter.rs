//! Filter stage: extension allow-list, exclude patterns, size ceiling

use regex::Regex;

use super::source::SourceFile;

/// Extensions reviewed when no explicit list is given
const SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "jsx", "ts", "tsx", "go", "java", "kt", "scala", "c", "h", "cc", "cpp", "hpp", "cs",
    "rb", "php", "swift", "sh", "sql", "toml", "yaml", "yml", "json",
];

/// Files larger than this are skipped by default (bytes)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 512 * 1024;

#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    /// Lowercase, no dot. Empty accepts every extension.
    extensions: Vec<String>,
    excludes: Vec<Regex>,
    max_size: Option<u64>,
}

impl FileFilter {
    /// Accept everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Common source extensions under the default size ceiling
    pub fn source_code() -> Self {
        Self::new()
            .with_extensions(SOURCE_EXTENSIONS.iter().copied())
            .with_max_size(DEFAULT_MAX_FILE_SIZE)
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    /// Exclude files whose id matches `pattern`
    pub fn exclude(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.excludes.push(Regex::new(pattern)?);
        Ok(self)
    }

    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size = Some(bytes);
        self
    }

    pub fn accepts(&self, file: &SourceFile) -> bool {
        if let Some(max) = self.max_size {
            if file.size > max {
                return false;
            }
        }

        if !self.extensions.is_empty() {
            match file.extension() {
                Some(ext) if self.extensions.contains(&ext) => {}
                _ => return false,
            }
        }

        !self.excludes.iter().any(|re| re.is_match(&file.id))
    }

    /// Keep accepted files, in their original order
    pub fn apply(&self, files: Vec<SourceFile>) -> Vec<SourceFile> {
        files.into_iter().filter(|f| self.accepts(f)).collect()
    }
}
