// src/dag/registry.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::dag::action::{TaskAction, TaskContext};
use crate::dag::graph::{ExecutionPlan, TaskGraph};
use crate::dag::scheduler::Scheduler;
use crate::dag::task_info::{ScheduledTask, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};
use crate::errors::{AssetflowError, Result};
use crate::pipeline::CompileError;

struct RegisteredTask {
    prerequisites: Vec<TaskName>,
    action: Arc<dyn TaskAction>,
    /// Held while the action executes, so two invocations never run the
    /// same task at the same time.
    turn: Arc<Mutex<()>>,
}

/// Named tasks with prerequisites.
///
/// Tasks are registered up front (`&mut self`); the registry is then shared
/// behind an `Arc` and every top-level [`TaskRegistry::run`] gets its own
/// scheduler, so completion state never leaks between invocations.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskName, RegisteredTask>,
    run_counter: AtomicU64,
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tasks: BTreeMap<&str, &[TaskName]> = self
            .tasks
            .iter()
            .map(|(name, t)| (name.as_str(), t.prerequisites.as_slice()))
            .collect();
        f.debug_struct("TaskRegistry").field("tasks", &tasks).finish()
    }
}

type Completion = (TaskName, TaskOutcome, Vec<CompileError>);

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Prerequisites are not checked here; unknown ones
    /// are reported when a task reaching them is planned.
    pub fn register(
        &mut self,
        name: impl Into<TaskName>,
        prerequisites: Vec<TaskName>,
        action: Arc<dyn TaskAction>,
    ) -> Result<()> {
        let name = name.into();
        if self.tasks.contains_key(&name) {
            return Err(AssetflowError::DuplicateTask(name));
        }
        debug!(task = %name, prerequisites = ?prerequisites, "registered task");
        self.tasks.insert(
            name,
            RegisteredTask {
                prerequisites,
                action,
                turn: Arc::new(Mutex::new(())),
            },
        );
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Registered task names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|s| s.as_str())
    }

    pub fn prerequisites_of(&self, name: &str) -> Option<&[TaskName]> {
        self.tasks.get(name).map(|t| t.prerequisites.as_slice())
    }

    pub fn graph(&self) -> TaskGraph {
        TaskGraph::from_edges(
            self.tasks
                .iter()
                .map(|(name, t)| (name.as_str(), t.prerequisites.as_slice())),
        )
    }

    /// Resolve `name` and its prerequisite closure without running anything.
    pub fn plan(&self, name: &str) -> Result<ExecutionPlan> {
        self.graph().resolve(name)
    }

    /// Run `name` after its transitive prerequisites.
    ///
    /// Each task in the closure runs exactly once, as soon as all of its
    /// prerequisites finished without a hard failure. Independent tasks run
    /// concurrently. Planning errors are returned before any action starts;
    /// task failures are reported in the [`RunReport`].
    pub async fn run(self: &Arc<Self>, name: &str) -> Result<RunReport> {
        let plan = self.plan(name)?;
        let run_id = self.run_counter.fetch_add(1, Ordering::Relaxed) + 1;

        info!(task = %name, run_id, tasks = plan.len(), "running task");

        let mut scheduler = Scheduler::from_plan(&plan, run_id);
        let mut in_flight: JoinSet<Completion> = JoinSet::new();
        let mut started = Vec::with_capacity(plan.len());
        let mut compile_errors = Vec::new();

        for task in scheduler.start() {
            started.push(task.name.clone());
            self.spawn_task(&mut in_flight, task);
        }

        while let Some(joined) = in_flight.join_next().await {
            let (task, outcome, mut errors) = match joined {
                Ok(completion) => completion,
                Err(e) => {
                    // The wrapper future catches action panics itself, so
                    // this only happens if the runtime is shutting down.
                    error!(run_id, error = %e, "task wrapper aborted");
                    return Err(AssetflowError::Other(anyhow::anyhow!(
                        "task wrapper aborted in run {run_id}: {e}"
                    )));
                }
            };
            compile_errors.append(&mut errors);

            let step = scheduler.handle_completion(&task, outcome);
            for next in step.newly_scheduled {
                started.push(next.name.clone());
                self.spawn_task(&mut in_flight, next);
            }
        }

        let outcomes = scheduler
            .outcomes()
            .map(|(name, state)| (name.to_string(), TaskRunState::from(Some(state))))
            .collect();

        let report = RunReport {
            root: plan.root,
            run_id,
            started,
            outcomes,
            compile_errors,
        };
        info!(task = %name, run_id, outcome = ?report.outcome(), "run finished");
        Ok(report)
    }

    fn spawn_task(self: &Arc<Self>, in_flight: &mut JoinSet<Completion>, task: ScheduledTask) {
        let ScheduledTask { name, run_id } = task;

        let Some(entry) = self.tasks.get(&name) else {
            // Plans only contain registered tasks.
            warn!(task = %name, "scheduled task is not registered");
            in_flight.spawn(async move { (name, TaskOutcome::Failed, Vec::new()) });
            return;
        };

        let action = Arc::clone(&entry.action);
        let turn = Arc::clone(&entry.turn);
        let ctx = TaskContext {
            task: name.clone(),
            run_id,
            registry: Arc::clone(self),
        };

        in_flight.spawn(async move {
            if turn.try_lock().is_err() {
                debug!(task = %name, run_id, "waiting for previous run of task to finish");
            }
            let _turn = turn.lock_owned().await;

            let result = tokio::spawn(action.run(ctx)).await;

            match result {
                Ok(Ok(())) => (name, TaskOutcome::Success, Vec::new()),
                Ok(Err(AssetflowError::SourceCompile { errors, .. })) => {
                    let count = errors.len();
                    (name, TaskOutcome::CompileErrors(count), errors)
                }
                Ok(Err(err)) => {
                    error!(task = %name, run_id, error = %err, "task failed");
                    (name, TaskOutcome::Failed, Vec::new())
                }
                Err(join_err) => {
                    error!(task = %name, run_id, error = %join_err, "task panicked");
                    (name, TaskOutcome::Failed, Vec::new())
                }
            }
        });
    }
}

/// Result of one top-level invocation.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub root: TaskName,
    pub run_id: u64,
    /// Tasks in the order their actions were started.
    pub started: Vec<TaskName>,
    /// Final state of every task in the closure.
    pub outcomes: BTreeMap<TaskName, TaskRunState>,
    pub compile_errors: Vec<CompileError>,
}

impl RunReport {
    /// Tasks that failed or were skipped because a prerequisite failed.
    pub fn failed_tasks(&self) -> Vec<TaskName> {
        self.outcomes
            .iter()
            .filter(|(_, state)| **state == TaskRunState::DoneFailed)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn outcome(&self) -> TaskOutcome {
        if self.outcomes.values().any(|s| *s == TaskRunState::DoneFailed) {
            TaskOutcome::Failed
        } else if self.outcomes.values().any(|s| *s == TaskRunState::DoneWithErrors) {
            TaskOutcome::CompileErrors(self.compile_errors.len())
        } else {
            TaskOutcome::Success
        }
    }

    pub fn into_result(self) -> Result<()> {
        match self.outcome() {
            TaskOutcome::Success => Ok(()),
            TaskOutcome::CompileErrors(_) => Err(AssetflowError::SourceCompile {
                task: self.root,
                errors: self.compile_errors,
            }),
            TaskOutcome::Failed => {
                let failed = self.failed_tasks();
                Err(AssetflowError::TaskFailed {
                    task: self.root,
                    failed,
                })
            }
        }
    }
}
