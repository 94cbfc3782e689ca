// src/engine/mod.rs

//! Watch/rebuild orchestration.
//!
//! This module ties together:
//! - the trigger queue (what happens when a task is triggered while it is
//!   already rebuilding)
//! - the runtime event loop that reacts to:
//!   - file-watch triggers
//!   - reload-only requests
//!   - task completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Outcome of one task, or of a whole invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// Finished, but this many source files failed to compile.
    CompileErrors(usize),
    Failed,
}

impl TaskOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Requested explicitly (tests, tooling).
    Manual,
    /// A watched path changed.
    FileWatch,
}

/// Events flowing into the runtime from the watcher, executor and signals.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Run `task`, then notify `reload` if it succeeds.
    TaskTriggered {
        task: TaskName,
        reload: ReloadKind,
        reason: TriggerReason,
    },
    /// Notify the reload channel without running anything (bindings that
    /// watch already-built output).
    ReloadRequested { kind: ReloadKind },
    /// An invocation started by the runtime finished.
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep, ScheduledRun};
pub use queue::TriggerQueue;
pub use runtime::Runtime;

pub use crate::types::{ReloadKind, TriggerWhileRunningBehaviour};
