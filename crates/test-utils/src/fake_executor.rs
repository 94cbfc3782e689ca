use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use assetflow::engine::{RuntimeEvent, ScheduledRun, TaskOutcome};
use assetflow::errors::Result;
use assetflow::exec::ExecutorBackend;
use tokio::sync::mpsc;

/// A fake executor that:
/// - records which runs were dispatched
/// - immediately reports `TaskCompleted` for each of them, with
///   `Success` unless another outcome was configured for the task.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<ScheduledRun>>>,
    outcomes: HashMap<String, TaskOutcome>,
    auto_complete: bool,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<ScheduledRun>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            outcomes: HashMap::new(),
            auto_complete: true,
        }
    }

    pub fn with_outcome(mut self, task: &str, outcome: TaskOutcome) -> Self {
        self.outcomes.insert(task.to_string(), outcome);
        self
    }

    /// Record runs but never complete them; the test sends
    /// `TaskCompleted` itself.
    pub fn manual(mut self) -> Self {
        self.auto_complete = false;
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_runs(
        &mut self,
        runs: Vec<ScheduledRun>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);

        Box::pin(async move {
            for run in runs {
                executed.lock().unwrap().push(run.clone());

                if !self.auto_complete {
                    continue;
                }

                let outcome = self
                    .outcomes
                    .get(&run.task)
                    .copied()
                    .unwrap_or(TaskOutcome::Success);
                tx.send(RuntimeEvent::TaskCompleted {
                    task: run.task.clone(),
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
