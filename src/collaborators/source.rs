//! File sources for the scan stage

use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::pipeline::PipelineError;

/// Directories never descended into
const SKIPPED_DIRS: &[&str] = &[".git", ".hg", ".svn", "target", "node_modules", "__pycache__", ".venv"];

/// One file found by a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    /// Path relative to the scan root, `/`-separated
    pub id: String,
    /// Absolute (or root-joined) path on disk
    pub path: PathBuf,
    pub size: u64,
}

impl SourceFile {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            size,
        }
    }

    /// Lowercased extension without the dot
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }
}

/// Produces the files of one execution
pub trait FileSource: Send + Sync {
    fn scan(&self, base: &Path) -> Result<Vec<SourceFile>, PipelineError>;
}

/// Recursive directory walk
///
/// Skips hidden entries and VCS/build directories. Unreadable entries are
/// logged and skipped; only a missing or unreadable root fails the scan.
#[derive(Debug, Clone)]
pub struct WalkDirSource {
    max_depth: Option<usize>,
    follow_links: bool,
}

impl Default for WalkDirSource {
    fn default() -> Self {
        Self {
            max_depth: None,
            follow_links: false,
        }
    }
}

impl WalkDirSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }
}

impl FileSource for WalkDirSource {
    fn scan(&self, base: &Path) -> Result<Vec<SourceFile>, PipelineError> {
        if !base.is_dir() {
            return Err(PipelineError::Scan(format!("not a directory: {}", base.display())));
        }

        let mut walker = WalkDir::new(base).follow_links(self.follow_links).sort_by_file_name();
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }

        let mut files = Vec::new();
        for entry in walker.into_iter().filter_entry(|e| e.depth() == 0 || !is_skipped(e)) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let id = relative_id(base, entry.path());
            files.push(SourceFile::new(id, entry.into_path(), size));
        }

        Ok(files)
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.file_type().is_dir() && SKIPPED_DIRS.contains(&name.as_ref()))
}

fn relative_id(base: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::create_dir_all(dir.path().join("target/debug")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("src/nested/util.rs"), "pub fn f() {}").unwrap();
        fs::write(dir.path().join("README.md"), "# hi").unwrap();
        fs::write(dir.path().join(".env"), "SECRET=1").unwrap();
        fs::write(dir.path().join(".git/HEAD"), "ref").unwrap();
        fs::write(dir.path().join("target/debug/out.rs"), "").unwrap();
        dir
    }

    #[test]
    fn test_scan_skips_hidden_and_build_dirs() {
        let dir = tree();
        let files = WalkDirSource::new().scan(dir.path()).unwrap();
        let ids: Vec<&str> = files.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["README.md", "src/main.rs", "src/nested/util.rs"]);
        assert_eq!(files[1].size, 12);
        assert_eq!(files[1].extension().as_deref(), Some("rs"));
    }

    #[test]
    fn test_scan_max_depth() {
        let dir = tree();
        let files = WalkDirSource::new().with_max_depth(2).scan(dir.path()).unwrap();
        assert!(files.iter().all(|f| f.id != "src/nested/util.rs"));
        assert!(files.iter().any(|f| f.id == "src/main.rs"));
    }

    #[test]
    fn test_scan_missing_root() {
        let dir = TempDir::new().unwrap();
        let err = WalkDirSource::new().scan(&dir.path().join("missing")).unwrap_err();
        assert_eq!(err.code(), "scan_failed");
    }
}
