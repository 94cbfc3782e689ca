// src/dag/task_info.rs

//! Per-invocation task state.

use crate::engine::{TaskName, TaskOutcome};

/// Per-invocation state of a task (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Waiting on prerequisites.
    Pending,
    /// Action dispatched and not yet finished.
    Running,
    DoneSuccess,
    /// Finished, but some source files failed to compile. Counts as
    /// satisfied for dependents: the other files' output is on disk.
    DoneWithErrors,
    /// Action failed, or a prerequisite failed so it never ran.
    DoneFailed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::DoneSuccess | RunState::DoneWithErrors | RunState::DoneFailed
        )
    }

    /// Whether dependents may start after this state.
    pub fn satisfies_dependents(self) -> bool {
        matches!(self, RunState::DoneSuccess | RunState::DoneWithErrors)
    }

    pub fn from_outcome(outcome: TaskOutcome) -> Self {
        match outcome {
            TaskOutcome::Success => RunState::DoneSuccess,
            TaskOutcome::CompileErrors(_) => RunState::DoneWithErrors,
            TaskOutcome::Failed => RunState::DoneFailed,
        }
    }
}

/// Public, read-only view of a task's state in an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The task is not part of this invocation.
    NotInRun,
    Pending,
    Running,
    DoneSuccess,
    DoneWithErrors,
    DoneFailed,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::DoneSuccess) => TaskRunState::DoneSuccess,
            Some(RunState::DoneWithErrors) => TaskRunState::DoneWithErrors,
            Some(RunState::DoneFailed) => TaskRunState::DoneFailed,
        }
    }
}

/// A task taking part in one invocation.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: TaskName,
    /// Direct prerequisites.
    pub deps: Vec<TaskName>,
    pub run_state: RunState,
}

/// A task the scheduler wants started now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    /// Identifier of the top-level invocation this task belongs to.
    pub run_id: u64,
}
