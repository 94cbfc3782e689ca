// src/pipeline/step.rs

//! Transformations applied to the records of a pipeline.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::config::{StepConfig, StepKindConfig};
use crate::exec::{run_shell, shell_quote};
use crate::pipeline::record::{CompileError, FileRecord};
use crate::types::{BuildMode, StepCondition};

/// Records that made it through a step, plus the files that did not.
#[derive(Debug, Default)]
pub struct StepOutput {
    pub records: Vec<FileRecord>,
    pub errors: Vec<CompileError>,
}

pub type StepFuture<'a> = Pin<Box<dyn Future<Output = Result<StepOutput>> + Send + 'a>>;

/// A stage of a pipeline.
///
/// A per-file failure (a compiler rejecting one file) goes into
/// [`StepOutput::errors`] and drops that record only. `Err` is for failures
/// that make the whole step meaningless, such as a missing compiler binary.
pub trait Step: Send + Sync + fmt::Debug {
    fn label(&self) -> &str;
    fn apply(&self, records: Vec<FileRecord>) -> StepFuture<'_>;
}

/// What a step does; the config-independent form of a `[[task.*.steps]]`
/// entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    Command {
        cmd: String,
        rename_ext: Option<String>,
    },
    Concat {
        name: String,
        separator: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSpec {
    pub condition: StepCondition,
    pub kind: StepKind,
}

impl From<&StepConfig> for StepSpec {
    fn from(cfg: &StepConfig) -> Self {
        let kind = match &cfg.kind {
            StepKindConfig::Command { cmd, rename_ext } => StepKind::Command {
                cmd: cmd.clone(),
                rename_ext: rename_ext.clone(),
            },
            StepKindConfig::Concat { name, separator } => StepKind::Concat {
                name: name.clone(),
                separator: separator.clone(),
            },
        };
        Self {
            condition: cfg.when,
            kind,
        }
    }
}

impl StepSpec {
    pub fn describe(&self) -> String {
        match &self.kind {
            StepKind::Command { cmd, rename_ext: Some(ext) } => format!("{cmd} (-> .{ext})"),
            StepKind::Command { cmd, rename_ext: None } => cmd.clone(),
            StepKind::Concat { name, .. } => format!("concat -> {name}"),
        }
    }
}

/// Select and build the steps that apply in `mode`, in order.
///
/// Called once when a pipeline is constructed; the mode never changes
/// afterwards.
pub fn steps_for(specs: &[StepSpec], mode: BuildMode, cwd: &Path) -> Vec<Arc<dyn Step>> {
    specs
        .iter()
        .filter(|spec| spec.condition.applies_to(mode))
        .map(|spec| -> Arc<dyn Step> {
            match &spec.kind {
                StepKind::Command { cmd, rename_ext } => Arc::new(CommandStep::new(
                    cmd.clone(),
                    rename_ext.clone(),
                    cwd.to_path_buf(),
                )),
                StepKind::Concat { name, separator } => Arc::new(ConcatStep::new(
                    name.clone(),
                    separator.clone().unwrap_or_else(|| "\n".to_string()),
                )),
            }
        })
        .collect()
}

/// Pipe every record through an external command: contents on stdin,
/// transformed contents on stdout.
///
/// `{file}` in the command is replaced by the record's source path and
/// `{name}` by its output file name, both shell-quoted.
///
/// At most `parallelism` commands run at once; the default is the number
/// of available CPUs.
#[derive(Debug, Clone)]
pub struct CommandStep {
    label: String,
    cmd: String,
    rename_ext: Option<String>,
    cwd: PathBuf,
    parallelism: usize,
}

impl CommandStep {
    pub fn new(cmd: String, rename_ext: Option<String>, cwd: PathBuf) -> Self {
        let label = cmd.split_whitespace().next().unwrap_or("command").to_string();
        let parallelism = std::thread::available_parallelism().map_or(4, |n| n.get());
        Self {
            label,
            cmd,
            rename_ext,
            cwd,
            parallelism,
        }
    }

    #[cfg(test)]
    fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    fn command_for(&self, record: &FileRecord) -> String {
        self.cmd
            .replace("{file}", &shell_quote(&record.source.to_string_lossy()))
            .replace("{name}", &shell_quote(&record.file_name()))
    }
}

impl Step for CommandStep {
    fn label(&self) -> &str {
        &self.label
    }

    fn apply(&self, records: Vec<FileRecord>) -> StepFuture<'_> {
        Box::pin(async move {
            let mut jobs = JoinSet::new();
            let limit = Arc::new(Semaphore::new(self.parallelism));

            for (idx, record) in records.into_iter().enumerate() {
                let cmd = self.command_for(&record);
                let cwd = self.cwd.clone();
                let limit = Arc::clone(&limit);
                jobs.spawn(async move {
                    // The semaphore is never closed.
                    let _permit = limit.acquire_owned().await.ok();
                    let output = run_shell(&cmd, &cwd, Some(record.contents.clone())).await;
                    (idx, record, output)
                });
            }

            let mut finished = Vec::with_capacity(jobs.len());
            while let Some(joined) = jobs.join_next().await {
                finished.push(joined.context("pipeline command task aborted")?);
            }
            finished.sort_by_key(|(idx, _, _)| *idx);

            let mut out = StepOutput::default();
            for (_, mut record, output) in finished {
                let output = output
                    .with_context(|| format!("step '{}' could not run", self.label))?;

                if output.success {
                    debug!(step = %self.label, file = %record.source.display(), "compiled");
                    record.contents = output.stdout;
                    if let Some(ext) = &self.rename_ext {
                        record.set_extension(ext);
                    }
                    out.records.push(record);
                } else {
                    out.errors.push(CompileError {
                        file: record.source,
                        step: self.label.clone(),
                        reason: output.failure_reason(),
                    });
                }
            }

            Ok(out)
        })
    }
}

/// Join every record into a single file, in output-path order.
#[derive(Debug, Clone)]
pub struct ConcatStep {
    name: String,
    separator: String,
}

impl ConcatStep {
    pub fn new(name: String, separator: String) -> Self {
        Self { name, separator }
    }
}

impl Step for ConcatStep {
    fn label(&self) -> &str {
        "concat"
    }

    fn apply(&self, mut records: Vec<FileRecord>) -> StepFuture<'_> {
        Box::pin(async move {
            if records.is_empty() {
                return Ok(StepOutput::default());
            }
            records.sort_by(|a, b| a.path.cmp(&b.path));

            let mut contents = Vec::new();
            for (i, record) in records.iter().enumerate() {
                if i > 0 {
                    contents.extend_from_slice(self.separator.as_bytes());
                }
                contents.extend_from_slice(&record.contents);
            }

            Ok(StepOutput {
                records: vec![FileRecord::new(&self.name, &self.name, contents)],
                errors: Vec::new(),
            })
        })
    }
}
