// src/tasks/serve.rs

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::dag::{ActionFuture, TaskAction, TaskContext};
use crate::engine::TaskName;
use crate::exec::{spawn_service, Readiness, ServiceHandle};

/// Services started by `serve` tasks, kept alive until the process exits.
#[derive(Debug, Clone, Default)]
pub struct ServiceSet {
    inner: Arc<Mutex<HashMap<TaskName, ServiceHandle>>>,
}

impl ServiceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn running(&self) -> Vec<TaskName> {
        let mut services = self.inner.lock().await;
        let mut names: Vec<TaskName> = services
            .iter_mut()
            .filter_map(|(name, handle)| handle.is_running().then(|| name.clone()))
            .collect();
        names.sort();
        names
    }

    /// Stop every service.
    pub async fn shutdown(&self) {
        let mut services = self.inner.lock().await;
        for (name, _) in services.drain() {
            info!(task = %name, "stopping service");
        }
    }
}

/// Starts a long-lived process. Completes once the process is ready; a
/// later run while the process is still alive does nothing.
#[derive(Debug, Clone)]
pub struct ServeAction {
    cmd: String,
    cwd: PathBuf,
    readiness: Readiness,
    services: ServiceSet,
}

impl ServeAction {
    pub fn new(cmd: impl Into<String>, cwd: PathBuf, readiness: Readiness, services: ServiceSet) -> Self {
        Self {
            cmd: cmd.into(),
            cwd,
            readiness,
            services,
        }
    }
}

impl TaskAction for ServeAction {
    fn run(&self, ctx: TaskContext) -> ActionFuture {
        let this = self.clone();

        Box::pin(async move {
            {
                let mut services = this.services.inner.lock().await;
                if let Some(handle) = services.get_mut(&ctx.task) {
                    if handle.is_running() {
                        debug!(task = %ctx.task, "service already running");
                        return Ok(());
                    }
                    info!(task = %ctx.task, "service exited; restarting");
                }
            }

            // The set stays unlocked while waiting for readiness so other
            // services start alongside. Runs of one task are serialised by
            // the registry.
            let handle = spawn_service(&ctx.task, &this.cmd, &this.cwd, this.readiness.clone()).await?;
            this.services.inner.lock().await.insert(ctx.task.clone(), handle);
            Ok(())
        })
    }
}
