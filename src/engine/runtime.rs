// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::reload::ReloadNotifier;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent, ScheduledRun};

/// Drives the watch/rebuild loop in response to `RuntimeEvent`s.
///
/// This is a thin IO shell around [`CoreRuntime`], which holds the
/// semantics. It reads events from the channel, starts invocations through
/// an [`ExecutorBackend`] and forwards reloads to a [`ReloadNotifier`].
pub struct Runtime<E: ExecutorBackend, R: ReloadNotifier> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    reload: R,
}

impl<E: ExecutorBackend, R: ReloadNotifier> fmt::Debug for Runtime<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend, R: ReloadNotifier> Runtime<E, R> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
        reload: R,
    ) -> Self {
        Self {
            core,
            event_rx,
            executor,
            reload,
        }
    }

    /// Main event loop. Returns once shutdown was requested and every
    /// in-flight invocation finished, or when the event channel closes.
    pub async fn run(mut self) -> Result<()> {
        info!("watching for changes");

        loop {
            let Some(event) = self.event_rx.recv().await else {
                info!("runtime event channel closed; exiting");
                break;
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("shutdown complete; stopping runtime");
                break;
            }
        }

        Ok(())
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchRuns(runs) => self.dispatch(runs).await,
            CoreCommand::NotifyReload(kind) => {
                self.reload.notify(kind).await;
                Ok(())
            }
        }
    }

    async fn dispatch(&mut self, runs: Vec<ScheduledRun>) -> Result<()> {
        if runs.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = runs.iter().map(|r| r.task.as_str()).collect();
        debug!(?names, "dispatching runs");

        self.executor.spawn_runs(runs).await
    }
}
