// src/pipeline/mod.rs

//! File pipelines: sources -> ordered steps -> destination directory.
//!
//! - [`sources`] resolves include/exclude globs to files.
//! - [`step`] defines the step trait and the command/concat steps.
//! - [`runner`] streams records through the steps and writes the results.

pub mod record;
pub mod runner;
pub mod sources;
pub mod step;

pub use record::{CompileError, FileRecord};
pub use runner::{Pipeline, PipelineReport, PipelineRunner};
pub use sources::{SourceFile, SourceSet};
pub use step::{steps_for, CommandStep, ConcatStep, Step, StepKind, StepOutput, StepSpec};
