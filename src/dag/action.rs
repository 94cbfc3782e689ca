// src/dag/action.rs

//! What a registered task does when it runs.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::dag::registry::TaskRegistry;
use crate::engine::TaskName;
use crate::errors::Result;

/// Boxed future returned by [`TaskAction::run`].
pub type ActionFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

/// Everything an action may need from the invocation that started it.
#[derive(Clone)]
pub struct TaskContext {
    pub task: TaskName,
    /// Identifier of the top-level invocation.
    pub run_id: u64,
    /// The registry the task belongs to. Composite actions (sequences) use
    /// it to start nested invocations.
    pub registry: Arc<TaskRegistry>,
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("task", &self.task)
            .field("run_id", &self.run_id)
            .finish()
    }
}

/// An asynchronous unit of work.
///
/// Returning `Err(AssetflowError::SourceCompile { .. })` means "finished, but
/// some inputs did not compile": the registry still runs dependents. Any
/// other error is a hard failure.
pub trait TaskAction: Send + Sync {
    fn run(&self, ctx: TaskContext) -> ActionFuture;
}

/// Adapter turning an async closure into a [`TaskAction`].
pub struct FnAction<F> {
    f: F,
}

impl<F, Fut> TaskAction for FnAction<F>
where
    F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn run(&self, ctx: TaskContext) -> ActionFuture {
        Box::pin((self.f)(ctx))
    }
}

/// Wrap an async closure as a shareable action.
pub fn action_fn<F, Fut>(f: F) -> Arc<dyn TaskAction>
where
    F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnAction { f })
}

/// Action of a pure grouping task: only its prerequisites do work.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAction;

impl TaskAction for NoopAction {
    fn run(&self, _ctx: TaskContext) -> ActionFuture {
        Box::pin(async { Ok(()) })
    }
}
