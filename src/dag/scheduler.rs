// src/dag/scheduler.rs

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::graph::ExecutionPlan;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};

/// Per-invocation state machine over a resolved [`ExecutionPlan`].
///
/// It is responsible for:
/// - deciding when a task is ready (all prerequisites satisfied)
/// - recording outcomes as tasks complete
/// - failing dependents when a task fails hard
///
/// It never runs anything itself; the registry drives it.
#[derive(Debug)]
pub struct Scheduler {
    run_id: u64,
    tasks: HashMap<TaskName, TaskInfo>,
    dependents: HashMap<TaskName, Vec<TaskName>>,
    started: bool,
}

impl Scheduler {
    /// Every task in the plan starts out `Pending`.
    pub fn from_plan(plan: &ExecutionPlan, run_id: u64) -> Self {
        let mut tasks = HashMap::with_capacity(plan.len());
        let mut dependents: HashMap<TaskName, Vec<TaskName>> = HashMap::new();

        for name in plan.order.iter() {
            let deps = plan.deps_of(name).to_vec();
            for dep in deps.iter() {
                dependents.entry(dep.clone()).or_default().push(name.clone());
            }
            tasks.insert(
                name.clone(),
                TaskInfo {
                    name: name.clone(),
                    deps,
                    run_state: RunState::Pending,
                },
            );
        }

        Self {
            run_id,
            tasks,
            dependents,
            started: false,
        }
    }

    /// Schedule every task without prerequisites. Later calls return nothing.
    pub fn start(&mut self) -> Vec<ScheduledTask> {
        if self.started {
            warn!(run_id = self.run_id, "scheduler already started; ignoring");
            return Vec::new();
        }
        self.started = true;
        debug!(run_id = self.run_id, tasks = self.tasks.len(), "scheduler: starting invocation");

        let mut manager = StateManager::new(&self.dependents, &mut self.tasks, self.run_id);
        manager.collect_new_ready_tasks()
    }

    /// Record the outcome of a running task and return what became ready.
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        match self.tasks.get_mut(task) {
            Some(info) if info.run_state == RunState::Running => {
                info.run_state = RunState::from_outcome(outcome);
                match outcome {
                    TaskOutcome::Success => {
                        debug!(task = %info.name, run_id = self.run_id, "task completed successfully");
                    }
                    TaskOutcome::CompileErrors(count) => {
                        warn!(
                            task = %info.name,
                            run_id = self.run_id,
                            errors = count,
                            "task completed with compile errors; dependents still run"
                        );
                    }
                    TaskOutcome::Failed => {
                        warn!(
                            task = %info.name,
                            run_id = self.run_id,
                            "task failed; failing dependents in this invocation"
                        );
                        step.newly_failed.push(info.name.clone());
                    }
                }
            }
            Some(info) => {
                warn!(
                    task = %task,
                    state = ?info.run_state,
                    "completion for a task that is not running; ignoring"
                );
                return step;
            }
            None => {
                warn!(task = %task, "completion for unknown task; ignoring");
                return step;
            }
        }

        let mut manager = StateManager::new(&self.dependents, &mut self.tasks, self.run_id);
        if outcome == TaskOutcome::Failed {
            step.newly_failed.extend(manager.mark_dependents_failed(task));
        }
        step.newly_scheduled = manager.collect_new_ready_tasks();
        step.run_just_finished = manager.all_tasks_terminal();

        if step.run_just_finished {
            info!(run_id = self.run_id, "scheduler: all tasks terminal; invocation finished");
        }

        step
    }

    /// Read-only view of a task's state in this invocation.
    pub fn run_state_of(&self, task: &str) -> TaskRunState {
        self.tasks.get(task).map(|info| info.run_state).into()
    }

    /// Whether the prerequisites of `task` are satisfied. `None` if the task
    /// is not part of this invocation.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        Some(ReadOnlyStateManager::new(&self.tasks).deps_satisfied_for_info(info))
    }

    pub fn is_finished(&self) -> bool {
        self.tasks.values().all(|info| info.run_state.is_terminal())
    }

    /// Final state of every task, for reporting.
    pub fn outcomes(&self) -> impl Iterator<Item = (&str, RunState)> {
        self.tasks
            .values()
            .map(|info| (info.name.as_str(), info.run_state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::graph::TaskGraph;

    fn plan(edges: &[(&str, Vec<&str>)], root: &str) -> ExecutionPlan {
        let owned: Vec<(String, Vec<String>)> = edges
            .iter()
            .map(|(n, deps)| (n.to_string(), deps.iter().map(|d| d.to_string()).collect()))
            .collect();
        TaskGraph::from_edges(owned.iter().map(|(n, d)| (n.as_str(), d.as_slice())))
            .resolve(root)
            .unwrap()
    }

    fn names(tasks: &[ScheduledTask]) -> Vec<&str> {
        tasks.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn diamond_schedules_each_task_once() {
        let p = plan(
            &[("A", vec![]), ("B", vec!["A"]), ("C", vec!["A"]), ("D", vec!["B", "C"])],
            "D",
        );
        let mut s = Scheduler::from_plan(&p, 1);

        assert_eq!(names(&s.start()), vec!["A"]);
        assert!(s.start().is_empty());

        let step = s.handle_completion("A", TaskOutcome::Success);
        assert_eq!(names(&step.newly_scheduled), vec!["B", "C"]);

        let step = s.handle_completion("B", TaskOutcome::Success);
        assert!(step.newly_scheduled.is_empty());
        assert_eq!(s.deps_satisfied("D"), Some(false));

        let step = s.handle_completion("C", TaskOutcome::Success);
        assert_eq!(names(&step.newly_scheduled), vec!["D"]);
        assert!(!step.run_just_finished);

        let step = s.handle_completion("D", TaskOutcome::Success);
        assert!(step.run_just_finished);
        assert!(s.is_finished());
    }

    #[test]
    fn compile_errors_do_not_block_dependents() {
        let p = plan(&[("sass", vec![]), ("build", vec!["sass"])], "build");
        let mut s = Scheduler::from_plan(&p, 7);
        s.start();

        let step = s.handle_completion("sass", TaskOutcome::CompileErrors(2));
        assert_eq!(names(&step.newly_scheduled), vec!["build"]);
        assert_eq!(step.newly_scheduled[0].run_id, 7);
        assert_eq!(s.run_state_of("sass"), TaskRunState::DoneWithErrors);
    }

    #[test]
    fn hard_failure_fails_dependents_transitively() {
        let p = plan(
            &[("A", vec![]), ("B", vec!["A"]), ("C", vec!["B"]), ("D", vec![]), ("E", vec!["C", "D"])],
            "E",
        );
        let mut s = Scheduler::from_plan(&p, 1);
        assert_eq!(names(&s.start()), vec!["A", "D"]);

        let mut step = s.handle_completion("A", TaskOutcome::Failed);
        step.newly_failed.sort();
        assert_eq!(step.newly_failed, vec!["A", "B", "C", "E"]);
        assert!(step.newly_scheduled.is_empty());
        assert!(!step.run_just_finished, "D is still running");

        let step = s.handle_completion("D", TaskOutcome::Success);
        assert!(step.newly_scheduled.is_empty());
        assert!(step.run_just_finished);
        assert_eq!(s.run_state_of("E"), TaskRunState::DoneFailed);
        assert_eq!(s.run_state_of("unrelated"), TaskRunState::NotInRun);
    }

    #[test]
    fn completion_for_task_not_running_is_ignored() {
        let p = plan(&[("A", vec![]), ("B", vec!["A"])], "B");
        let mut s = Scheduler::from_plan(&p, 1);
        s.start();

        let step = s.handle_completion("B", TaskOutcome::Success);
        assert!(step.newly_scheduled.is_empty());
        assert_eq!(s.run_state_of("B"), TaskRunState::Pending);
    }
}
