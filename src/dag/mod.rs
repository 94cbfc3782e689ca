// src/dag/mod.rs

//! Task registry and per-invocation scheduling.
//!
//! - [`graph`] holds the task graph and resolves execution plans.
//! - [`registry`] owns the registered tasks and runs invocations.
//! - [`scheduler`] is the pure per-invocation state machine that decides
//!   which tasks are ready.
//! - [`state_manager`] implements its state transitions.
//! - [`action`] defines what a task does when it runs.

pub mod action;
pub mod graph;
pub mod registry;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use action::{action_fn, ActionFuture, FnAction, NoopAction, TaskAction, TaskContext};
pub use graph::{ExecutionPlan, TaskGraph};
pub use registry::{RunReport, TaskRegistry};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{RunState, ScheduledTask, TaskRunState};
