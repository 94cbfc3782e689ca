// src/dag/state_manager.rs

//! Per-invocation state transitions.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::engine::TaskName;

/// Mutable view over the tasks of one invocation.
pub struct StateManager<'a> {
    dependents: &'a HashMap<TaskName, Vec<TaskName>>,
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
    run_id: u64,
}

impl<'a> StateManager<'a> {
    pub fn new(
        dependents: &'a HashMap<TaskName, Vec<TaskName>>,
        tasks: &'a mut HashMap<TaskName, TaskInfo>,
        run_id: u64,
    ) -> Self {
        Self {
            dependents,
            tasks,
            run_id,
        }
    }

    /// Mark every pending or running dependent of a failed task (transitively)
    /// as `DoneFailed`. They will never run in this invocation.
    ///
    /// Returns the newly failed tasks, excluding `failed_task` itself.
    pub fn mark_dependents_failed(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self
            .dependents
            .get(failed_task)
            .cloned()
            .unwrap_or_default();

        let mut newly_failed = Vec::new();

        while let Some(name) = stack.pop() {
            if let Some(info) = self.tasks.get_mut(&name) {
                match info.run_state {
                    RunState::Pending | RunState::Running => {
                        info.run_state = RunState::DoneFailed;
                        debug!(
                            task = %info.name,
                            "marking dependent as DoneFailed due to upstream failure"
                        );
                        newly_failed.push(info.name.clone());
                        if let Some(next) = self.dependents.get(&name) {
                            stack.extend(next.iter().cloned());
                        }
                    }
                    RunState::DoneSuccess | RunState::DoneWithErrors | RunState::DoneFailed => {}
                }
            }
        }

        newly_failed
    }

    /// Collect `Pending` tasks whose prerequisites are satisfied, mark them
    /// `Running` and return them, in name order.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        let mut candidates: Vec<TaskName> = {
            let ro = ReadOnlyStateManager::new(self.tasks);
            self.tasks
                .values()
                .filter(|info| info.run_state == RunState::Pending && ro.deps_satisfied_for_info(info))
                .map(|info| info.name.clone())
                .collect()
        };
        candidates.sort();

        let mut ready = Vec::with_capacity(candidates.len());
        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                info!(task = %info.name, run_id = self.run_id, "starting task");
                info.run_state = RunState::Running;
                ready.push(ScheduledTask {
                    name: info.name.clone(),
                    run_id: self.run_id,
                });
            }
        }

        ready
    }

    pub fn all_tasks_terminal(&self) -> bool {
        self.tasks.values().all(|info| info.run_state.is_terminal())
    }
}

/// Shared-reference counterpart of [`StateManager`] for dependency checks.
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a HashMap<TaskName, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a HashMap<TaskName, TaskInfo>) -> Self {
        Self { tasks }
    }

    /// A task may start once every prerequisite finished without a hard
    /// failure. Compile errors in a prerequisite do not block it.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.deps.iter().all(|dep_name| match self.tasks.get(dep_name) {
            Some(dep) => dep.run_state.satisfies_dependents(),
            None => {
                warn!(
                    task = %info.name,
                    dep = %dep_name,
                    "dependency missing from invocation"
                );
                false
            }
        })
    }
}
