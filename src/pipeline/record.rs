// src/pipeline/record.rs

use std::fmt;
use std::path::{Path, PathBuf};

/// One file flowing through a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Output path, relative to the destination directory.
    pub path: PathBuf,
    /// Where the record came from, for error messages and `{file}`.
    pub source: PathBuf,
    pub contents: Vec<u8>,
}

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>, source: impl Into<PathBuf>, contents: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
            contents,
        }
    }

    /// Final component of the output path.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn set_extension(&mut self, ext: &str) {
        self.path.set_extension(ext);
    }

    pub fn source_path(&self) -> &Path {
        &self.source
    }
}

/// A single source file that failed to compile in some step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub file: PathBuf,
    /// Label of the step that failed, usually the compiler name.
    pub step: String,
    pub reason: String,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.file.display(), self.step, self.reason)
    }
}
