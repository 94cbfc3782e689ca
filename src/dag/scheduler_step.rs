// src/dag/scheduler_step.rs

//! Step-by-step result type for the scheduler.

use crate::dag::task_info::ScheduledTask;
use crate::engine::TaskName;

/// Structured result of a single scheduler "step".
///
/// Tests use this to step an invocation by hand and assert on what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that became ready to run as a result of this step.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Tasks newly marked as failed in this step: the task that failed and
    /// every dependent that can no longer run.
    pub newly_failed: Vec<TaskName>,
    /// Whether every task of the invocation is now terminal.
    pub run_just_finished: bool,
}
