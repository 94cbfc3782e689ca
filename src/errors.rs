// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::pipeline::CompileError;

#[derive(Error, Debug)]
pub enum AssetflowError {
    /// Invalid task file, invalid mode, bad glob, etc. Fatal at startup.
    #[error("Configuration error: {0}")]
    StartupConfig(String),

    #[error("Task '{0}' is already registered")]
    DuplicateTask(String),

    #[error("Task not found: {0}")]
    UnknownTask(String),

    #[error("Task '{task}' has unknown prerequisite '{prerequisite}'")]
    UnknownPrerequisite { task: String, prerequisite: String },

    #[error("Cycle detected in task graph involving task '{0}'")]
    Cycle(String),

    /// One or more source files failed to compile. Output for the other
    /// files of the same task has still been written.
    #[error("{} source file(s) failed to compile in task '{task}'", errors.len())]
    SourceCompile {
        task: String,
        errors: Vec<CompileError>,
    },

    #[error("Filesystem error: {0}")]
    FileSystem(String),

    #[error("Task '{task}' failed (failed tasks: {})", failed.join(", "))]
    TaskFailed { task: String, failed: Vec<String> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AssetflowError {
    /// Errors that must abort the process before (or instead of) running
    /// any further task, even in watch mode.
    pub fn is_startup_error(&self) -> bool {
        matches!(
            self,
            AssetflowError::StartupConfig(_)
                | AssetflowError::UnknownTask(_)
                | AssetflowError::UnknownPrerequisite { .. }
                | AssetflowError::Cycle(_)
                | AssetflowError::Toml(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AssetflowError>;
