// src/tasks/pipeline.rs

use std::sync::Arc;

use crate::dag::{ActionFuture, TaskAction, TaskContext};
use crate::errors::AssetflowError;
use crate::pipeline::{Pipeline, PipelineRunner};

/// Runs one pipeline. Compile errors surface as `SourceCompile` after the
/// remaining files were written.
#[derive(Debug, Clone)]
pub struct PipelineAction {
    pipeline: Arc<Pipeline>,
    runner: PipelineRunner,
}

impl PipelineAction {
    pub fn new(pipeline: Pipeline, runner: PipelineRunner) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            runner,
        }
    }
}

impl TaskAction for PipelineAction {
    fn run(&self, ctx: TaskContext) -> ActionFuture {
        let pipeline = Arc::clone(&self.pipeline);
        let runner = self.runner.clone();

        Box::pin(async move {
            let report = runner.run(&pipeline).await?;
            if report.errors.is_empty() {
                Ok(())
            } else {
                Err(AssetflowError::SourceCompile {
                    task: ctx.task,
                    errors: report.errors,
                })
            }
        })
    }
}
