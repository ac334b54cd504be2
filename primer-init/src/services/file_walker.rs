//! File catalog walker
//!
//! Recursively walks a root folder, prunes excluded directories, classifies
//! each file by name/extension, reads what the category calls for and hashes
//! what was read. The walk is a lazy iterator; calling [`FileCatalogWalker::walk`]
//! again starts a fresh traversal.
//!
//! A file that cannot be stat'ed or read yields a `Skipped` draft and a
//! warning. Nothing a single file does can abort the walk.

use crate::models::{ExtractedFacts, FileCategory, FileRecord, FileStatus};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Version-control metadata, build caches and dependency caches
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "target",
    "node_modules",
    "__pycache__",
    ".venv",
    ".cache",
    ".mypy_cache",
    ".pytest_cache",
    "dist",
    "build",
];

/// 10 MiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Bytes read from large structured-data files
pub const DEFAULT_DATA_PREFIX_BYTES: usize = 10 * 1024;

/// Errors that prevent the walk from starting
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Text read from a file
///
/// `Debug` prints only the length so credential text never reaches logs.
#[derive(Clone, PartialEq, Eq)]
pub struct FileContent(String);

impl FileContent {
    pub fn new(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for FileContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileContent({} bytes)", self.0.len())
    }
}

/// One walked file before extraction
#[derive(Debug, Clone)]
pub struct FileDraft {
    /// Root-relative path with `/` separators
    pub path: String,
    pub absolute_path: PathBuf,
    pub size: u64,
    pub category: FileCategory,
    pub content_hash: String,
    /// Text handed to extraction; `None` for binary categories and skipped files
    pub content: Option<FileContent>,
    /// `Pending` or `Skipped`
    pub status: FileStatus,
}

impl FileDraft {
    /// The record persisted during the walk (no facts yet)
    pub fn to_record(&self, timestamp: DateTime<Utc>) -> FileRecord {
        FileRecord {
            path: self.path.clone(),
            size: self.size,
            category: self.category,
            content_hash: self.content_hash.clone(),
            extracted_facts: ExtractedFacts::default(),
            status: self.status,
            timestamp,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.status == FileStatus::Skipped
    }
}

/// Walker configuration; holds no cross-file state
#[derive(Debug, Clone)]
pub struct FileCatalogWalker {
    exclude: HashSet<String>,
    max_file_size: u64,
    data_prefix_bytes: usize,
}

impl FileCatalogWalker {
    pub fn new(exclude: impl IntoIterator<Item = String>, max_file_size: u64, data_prefix_bytes: usize) -> Self {
        Self {
            exclude: exclude.into_iter().collect(),
            max_file_size,
            data_prefix_bytes,
        }
    }

    /// Root must exist and be a directory
    pub fn check_root(root: &Path) -> Result<(), ScanError> {
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }
        Ok(())
    }

    /// Start a lazy traversal of `root`
    pub fn walk(&self, root: &Path) -> Result<CatalogWalk<'_>, ScanError> {
        Self::check_root(root)?;

        let exclude = &self.exclude;
        let entries = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| !(e.depth() > 0 && e.file_type().is_dir() && is_excluded_entry(e, exclude)));

        Ok(CatalogWalk {
            walker: self,
            root: root.to_path_buf(),
            entries: Box::new(entries),
        })
    }

    /// Stat, classify, read and hash one file
    fn draft_for(&self, absolute_path: &Path, relative_path: String) -> FileDraft {
        let file_name = absolute_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let category = classify(&file_name);

        let mut draft = FileDraft {
            path: relative_path,
            absolute_path: absolute_path.to_path_buf(),
            size: 0,
            category,
            content_hash: String::new(),
            content: None,
            status: FileStatus::Pending,
        };

        let size = match std::fs::metadata(absolute_path) {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                tracing::warn!(file = %draft.path, error = %e, "Failed to stat file, skipping");
                draft.status = FileStatus::Skipped;
                return draft;
            }
        };
        draft.size = size;

        if size > self.max_file_size {
            tracing::debug!(file = %draft.path, size, max = self.max_file_size, "File exceeds size threshold, skipping");
            draft.status = FileStatus::Skipped;
            return draft;
        }

        match read_file(absolute_path, category, size, self.data_prefix_bytes) {
            Ok(read) => {
                draft.content_hash = read.content_hash;
                draft.content = read.content;
            }
            Err(e) => {
                tracing::warn!(file = %draft.path, error = %e, "Failed to read file, skipping");
                draft.status = FileStatus::Skipped;
            }
        }

        draft
    }
}

/// What one read of a file produced
#[derive(Debug)]
pub struct FileRead {
    pub content_hash: String,
    /// `None` for categories whose text is never handed on
    pub content: Option<FileContent>,
    /// Only a prefix was read
    pub truncated: bool,
}

/// Read what `category` calls for and hash it
///
/// Text categories are read in full; everything else only up to
/// `data_prefix_bytes`. Only text and data categories keep their content.
pub fn read_file(
    path: &Path,
    category: FileCategory,
    size: u64,
    data_prefix_bytes: usize,
) -> std::io::Result<FileRead> {
    let (bytes, truncated) = if category.reads_full_text() {
        (std::fs::read(path)?, false)
    } else {
        (read_prefix(path, data_prefix_bytes)?, size > data_prefix_bytes as u64)
    };

    let content = (category.reads_full_text() || category == FileCategory::Data)
        .then(|| FileContent::new(String::from_utf8_lossy(&bytes).into_owned()));

    Ok(FileRead {
        content_hash: hash_bytes(&bytes),
        content,
        truncated,
    })
}

impl Default for FileCatalogWalker {
    fn default() -> Self {
        Self::new(
            DEFAULT_EXCLUDES.iter().map(|s| s.to_string()),
            DEFAULT_MAX_FILE_SIZE,
            DEFAULT_DATA_PREFIX_BYTES,
        )
    }
}

fn is_excluded_entry(entry: &DirEntry, exclude: &HashSet<String>) -> bool {
    exclude.contains(entry.file_name().to_string_lossy().as_ref())
}

/// Lazy sequence of [`FileDraft`]s for one traversal
pub struct CatalogWalk<'a> {
    walker: &'a FileCatalogWalker,
    root: PathBuf,
    entries: Box<dyn Iterator<Item = walkdir::Result<DirEntry>> + Send + 'a>,
}

impl Iterator for CatalogWalk<'_> {
    type Item = FileDraft;

    fn next(&mut self) -> Option<FileDraft> {
        loop {
            match self.entries.next()? {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let relative = relative_path(&self.root, entry.path());
                    return Some(self.walker.draft_for(entry.path(), relative));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Error accessing entry, continuing walk");
                }
            }
        }
    }
}

/// Root-relative path joined with `/`
pub fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Hex SHA-256
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn read_prefix(path: &Path, limit: usize) -> std::io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut buffer = Vec::with_capacity(limit.min(64 * 1024));
    file.take(limit as u64).read_to_end(&mut buffer)?;
    Ok(buffer)
}

/// Classify a file by its name
///
/// Name rules (credentials, build manifests) win over the extension table.
pub fn classify(file_name: &str) -> FileCategory {
    let name = file_name.to_lowercase();

    if is_credentials_name(&name) {
        return FileCategory::Credentials;
    }

    if matches!(
        name.as_str(),
        "makefile"
            | "gnumakefile"
            | "cmakelists.txt"
            | "cargo.toml"
            | "cargo.lock"
            | "package.json"
            | "package-lock.json"
            | "yarn.lock"
            | "pnpm-lock.yaml"
            | "pyproject.toml"
            | "setup.cfg"
            | "go.mod"
            | "go.sum"
            | "pom.xml"
            | "build.gradle"
            | "settings.gradle"
            | "gemfile"
            | "gemfile.lock"
            | "justfile"
    ) || name.starts_with("dockerfile")
    {
        return FileCategory::Build;
    }

    let extension = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext,
        _ => return FileCategory::Other,
    };

    match extension {
        "rs" | "py" | "js" | "mjs" | "cjs" | "ts" | "tsx" | "jsx" | "go" | "java" | "kt" | "kts"
        | "c" | "h" | "cc" | "cpp" | "hpp" | "cs" | "rb" | "php" | "swift" | "scala" | "sh"
        | "bash" | "zsh" | "ps1" | "sql" | "lua" | "pl" | "r" | "dart" | "ex" | "exs" | "hs"
        | "vue" | "svelte" => FileCategory::SourceCode,
        "toml" | "yaml" | "yml" | "ini" | "cfg" | "conf" | "json" | "properties" | "env" => {
            FileCategory::Configuration
        }
        "md" | "markdown" | "rst" | "txt" | "adoc" | "org" | "tex" => FileCategory::Documentation,
        "csv" | "tsv" | "jsonl" | "ndjson" | "xml" | "parquet" | "db" | "sqlite" | "xlsx" | "xls"
        | "avro" => FileCategory::Data,
        "log" | "out" | "err" => FileCategory::Logs,
        "png" | "jpg" | "jpeg" | "gif" | "svg" | "ico" | "webp" | "bmp" | "mp3" | "mp4" | "wav"
        | "ogg" | "flac" | "woff" | "woff2" | "ttf" | "otf" | "pdf" | "zip" | "gz" | "tar" => {
            FileCategory::Assets
        }
        "gradle" | "mk" | "cmake" | "bazel" | "bzl" | "lock" => FileCategory::Build,
        _ => FileCategory::Other,
    }
}

fn is_credentials_name(name: &str) -> bool {
    let template = name.ends_with(".example") || name.ends_with(".sample") || name.ends_with(".template");
    if template {
        return false;
    }

    name == ".env"
        || name.starts_with(".env.")
        || name == ".netrc"
        || name == "id_rsa"
        || name == "id_ed25519"
        || name == "credentials"
        || name.starts_with("credentials.")
        || name.starts_with("secrets.")
        || name.ends_with(".pem")
        || name.ends_with(".key")
        || name.ends_with(".p12")
        || name.ends_with(".pfx")
}
