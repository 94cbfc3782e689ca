// src/tasks/watch.rs

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::dag::{ActionFuture, TaskAction, TaskContext};

/// Watch bindings requested by `watch` tasks during the startup run.
///
/// The watch loop itself starts after the requested tasks finished; tasks
/// only record which bindings it should cover.
#[derive(Debug, Clone, Default)]
pub struct WatchRequests {
    inner: Arc<Mutex<BTreeSet<String>>>,
}

impl WatchRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request<'a>(&self, bindings: impl IntoIterator<Item = &'a String>) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.extend(bindings.into_iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).is_empty()
    }

    /// Requested binding names, sorted.
    pub fn bindings(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct WatchAction {
    bindings: Vec<String>,
    requests: WatchRequests,
}

impl WatchAction {
    pub fn new(bindings: Vec<String>, requests: WatchRequests) -> Self {
        Self { bindings, requests }
    }
}

impl TaskAction for WatchAction {
    fn run(&self, ctx: TaskContext) -> ActionFuture {
        let this = self.clone();
        Box::pin(async move {
            info!(task = %ctx.task, bindings = ?this.bindings, "watch requested");
            this.requests.request(this.bindings.iter());
            Ok(())
        })
    }
}
