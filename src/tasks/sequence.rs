// src/tasks/sequence.rs

use tracing::{info, warn};

use crate::dag::{ActionFuture, TaskAction, TaskContext};
use crate::engine::{TaskName, TaskOutcome};
use crate::errors::AssetflowError;

/// Runs other tasks one after another, each as its own invocation, and
/// finishes only when the last one has.
///
/// A hard failure stops the sequence. Compile errors do not; they are
/// reported once every member ran.
#[derive(Debug, Clone)]
pub struct SequenceAction {
    tasks: Vec<TaskName>,
}

impl SequenceAction {
    pub fn new(tasks: Vec<TaskName>) -> Self {
        Self { tasks }
    }
}

impl TaskAction for SequenceAction {
    fn run(&self, ctx: TaskContext) -> ActionFuture {
        let tasks = self.tasks.clone();

        Box::pin(async move {
            let mut compile_errors = Vec::new();

            for member in tasks.iter() {
                info!(task = %ctx.task, member = %member, "sequence step");
                let report = ctx.registry.run(member).await?;

                match report.outcome() {
                    TaskOutcome::Success => {}
                    TaskOutcome::CompileErrors(count) => {
                        warn!(task = %ctx.task, member = %member, errors = count, "continuing after compile errors");
                        compile_errors.extend(report.compile_errors);
                    }
                    TaskOutcome::Failed => {
                        let mut failed = report.failed_tasks();
                        if !failed.contains(member) {
                            failed.push(member.clone());
                        }
                        return Err(AssetflowError::TaskFailed {
                            task: ctx.task,
                            failed,
                        });
                    }
                }
            }

            if compile_errors.is_empty() {
                Ok(())
            } else {
                Err(AssetflowError::SourceCompile {
                    task: ctx.task,
                    errors: compile_errors,
                })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::dag::{action_fn, TaskAction, TaskRegistry};
    use crate::errors::AssetflowError;

    type Log = Arc<Mutex<Vec<String>>>;

    fn slow_recording(log: &Log, label: &'static str, fail: bool) -> Arc<dyn TaskAction> {
        let log = Arc::clone(log);
        action_fn(move |_ctx| {
            let log = Arc::clone(&log);
            async move {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                log.lock().unwrap().push(label.to_string());
                if fail {
                    Err(AssetflowError::FileSystem("boom".into()))
                } else {
                    Ok(())
                }
            }
        })
    }

    fn registry(log: &Log, fail_first: bool) -> Arc<TaskRegistry> {
        let mut reg = TaskRegistry::new();
        reg.register("first", vec![], slow_recording(log, "first", fail_first))
            .unwrap();
        reg.register("second", vec![], slow_recording(log, "second", false))
            .unwrap();
        reg.register(
            "seq",
            vec![],
            Arc::new(SequenceAction::new(vec!["first".into(), "second".into()])),
        )
        .unwrap();
        Arc::new(reg)
    }

    #[tokio::test]
    async fn members_complete_before_sequence_does() {
        let log: Log = Arc::default();
        let reg = registry(&log, false);

        let report = reg.run("seq").await.unwrap();
        assert_eq!(report.outcome(), TaskOutcome::Success);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn hard_failure_stops_the_sequence() {
        let log: Log = Arc::default();
        let reg = registry(&log, true);

        let report = reg.run("seq").await.unwrap();
        assert_eq!(report.outcome(), TaskOutcome::Failed);
        assert_eq!(*log.lock().unwrap(), vec!["first"]);
    }
}
