#![allow(dead_code)]

pub use assetflow_test_utils::builders;
pub use assetflow_test_utils::{init_tracing, with_timeout};

use std::sync::{Arc, Mutex};

use assetflow::dag::{action_fn, TaskAction};
use assetflow::errors::AssetflowError;

/// Shared log of task names, in the order their actions ran.
pub type RunLog = Arc<Mutex<Vec<String>>>;

pub fn run_log() -> RunLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Action that appends its task name to `log`.
pub fn recording(log: &RunLog) -> Arc<dyn TaskAction> {
    let log = Arc::clone(log);
    action_fn(move |ctx| {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push(ctx.task.clone());
            Ok::<(), AssetflowError>(())
        }
    })
}

pub fn entries(log: &RunLog) -> Vec<String> {
    log.lock().unwrap().clone()
}
