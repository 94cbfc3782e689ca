// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::engine::queue::TriggerQueue;
use crate::engine::{TaskName, TaskOutcome, TriggerReason};
use crate::types::ReloadKind;

/// A task invocation the shell should start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledRun {
    pub task: TaskName,
    /// Reload to send once the run succeeds.
    pub reload: ReloadKind,
}

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Start these invocations.
    DispatchRuns(Vec<ScheduledRun>),
    /// Tell the reload channel to refresh clients.
    NotifyReload(ReloadKind),
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Mutable state shared by the handlers.
#[derive(Debug)]
pub struct CoreState {
    /// Tasks with an invocation in flight, with the reload to send when it
    /// succeeds.
    pub running: HashMap<TaskName, ReloadKind>,
    pub queue: TriggerQueue,
    pub shutting_down: bool,
}

/// Handle a task trigger.
///
/// - An idle task is dispatched at once.
/// - A running task gets a pending re-run (queue mode) or the trigger is
///   dropped (skip mode).
pub fn handle_task_trigger(
    state: &mut CoreState,
    task: TaskName,
    reload: ReloadKind,
    reason: TriggerReason,
) -> CoreStep {
    if state.shutting_down {
        debug!(task = %task, "shutting down; ignoring trigger");
        return CoreStep {
            commands: Vec::new(),
            keep_running: !state.running.is_empty(),
        };
    }

    if state.running.contains_key(&task) {
        state.queue.record_trigger(&task, reload);
        return CoreStep::running(Vec::new());
    }

    info!(task = %task, ?reason, "rebuilding");
    state.running.insert(task.clone(), reload);
    CoreStep::running(vec![CoreCommand::DispatchRuns(vec![ScheduledRun {
        task,
        reload,
    }])])
}

/// Handle a reload-only request.
pub fn handle_reload_request(state: &mut CoreState, kind: ReloadKind) -> CoreStep {
    if state.shutting_down || kind == ReloadKind::None {
        return CoreStep {
            commands: Vec::new(),
            keep_running: !state.shutting_down || !state.running.is_empty(),
        };
    }
    CoreStep::running(vec![CoreCommand::NotifyReload(kind)])
}

/// Handle the end of an invocation.
///
/// A successful run notifies its reload kind. Failed runs and runs with
/// compile errors keep clients on the last good output. A pending re-run
/// is dispatched afterwards.
pub fn handle_task_completion(
    state: &mut CoreState,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    let mut commands = Vec::new();

    let Some(reload) = state.running.remove(&task) else {
        warn!(task = %task, "completion for a task that is not running; ignoring");
        return CoreStep {
            commands,
            keep_running: !state.shutting_down || !state.running.is_empty(),
        };
    };

    match outcome {
        TaskOutcome::Success => {
            if reload != ReloadKind::None {
                commands.push(CoreCommand::NotifyReload(reload));
            }
        }
        TaskOutcome::CompileErrors(count) => {
            warn!(task = %task, errors = count, "rebuild had compile errors; not reloading");
        }
        TaskOutcome::Failed => {
            warn!(task = %task, "rebuild failed; not reloading");
        }
    }

    if state.shutting_down {
        return CoreStep {
            commands,
            keep_running: !state.running.is_empty(),
        };
    }

    if let Some(next_reload) = state.queue.take(&task) {
        debug!(task = %task, "starting pending re-run");
        state.running.insert(task.clone(), next_reload);
        commands.push(CoreCommand::DispatchRuns(vec![ScheduledRun {
            task,
            reload: next_reload,
        }]));
    }

    CoreStep::running(commands)
}

/// Begin a graceful shutdown: drop pending re-runs and stop once nothing is
/// in flight.
pub fn handle_shutdown(state: &mut CoreState) -> CoreStep {
    state.shutting_down = true;
    let dropped = state.queue.clear();
    info!(
        in_flight = state.running.len(),
        dropped_pending = dropped,
        "shutdown requested"
    );
    CoreStep {
        commands: Vec::new(),
        keep_running: !state.running.is_empty(),
    }
}
