// src/tasks/command.rs

use std::path::PathBuf;

use anyhow::anyhow;
use tracing::{debug, info};

use crate::dag::{ActionFuture, TaskAction, TaskContext};
use crate::errors::AssetflowError;
use crate::exec::run_shell;

/// Runs a one-shot shell command; a non-zero exit fails the task.
#[derive(Debug, Clone)]
pub struct CommandAction {
    cmd: String,
    cwd: PathBuf,
}

impl CommandAction {
    pub fn new(cmd: impl Into<String>, cwd: PathBuf) -> Self {
        Self {
            cmd: cmd.into(),
            cwd,
        }
    }
}

impl TaskAction for CommandAction {
    fn run(&self, ctx: TaskContext) -> ActionFuture {
        let cmd = self.cmd.clone();
        let cwd = self.cwd.clone();

        Box::pin(async move {
            info!(task = %ctx.task, cmd = %cmd, "running command");
            let output = run_shell(&cmd, &cwd, None).await?;

            for line in String::from_utf8_lossy(&output.stdout).lines() {
                debug!(task = %ctx.task, "stdout: {}", line);
            }

            if output.success {
                Ok(())
            } else {
                Err(AssetflowError::Other(anyhow!(
                    "command `{cmd}` failed: {}",
                    output.failure_reason()
                )))
            }
        })
    }
}
