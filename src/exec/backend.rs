// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of calling the registry
//! directly, so tests can swap in a fake that records dispatched runs and
//! emits completions on demand.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::error;

use crate::dag::TaskRegistry;
use crate::engine::{RuntimeEvent, ScheduledRun, TaskOutcome};
use crate::errors::Result;

/// How dispatched runs get executed.
pub trait ExecutorBackend: Send {
    /// Start the given invocations. Implementations must eventually report a
    /// `RuntimeEvent::TaskCompleted` for each of them.
    fn spawn_runs(
        &mut self,
        runs: Vec<ScheduledRun>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: each run is a `TaskRegistry::run` in its own tokio
/// task.
pub struct RegistryExecutor {
    registry: Arc<TaskRegistry>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl RegistryExecutor {
    pub fn new(registry: Arc<TaskRegistry>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            registry,
            runtime_tx,
        }
    }
}

impl ExecutorBackend for RegistryExecutor {
    fn spawn_runs(
        &mut self,
        runs: Vec<ScheduledRun>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for run in runs {
                let registry = Arc::clone(&self.registry);
                let tx = self.runtime_tx.clone();

                tokio::spawn(async move {
                    let outcome = match registry.run(&run.task).await {
                        Ok(report) => report.outcome(),
                        Err(e) => {
                            error!(task = %run.task, error = %e, "could not start rebuild");
                            TaskOutcome::Failed
                        }
                    };
                    let _ = tx
                        .send(RuntimeEvent::TaskCompleted {
                            task: run.task,
                            outcome,
                        })
                        .await;
                });
            }
            Ok(())
        })
    }
}
