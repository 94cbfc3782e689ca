// tests/registry_scheduling.rs

mod common;
use crate::common::{entries, init_tracing, recording, run_log, with_timeout};

use std::sync::Arc;

use assetflow::dag::{action_fn, TaskRegistry, TaskRunState};
use assetflow::engine::TaskOutcome;
use assetflow::errors::AssetflowError;
use tokio::sync::Barrier;

fn names(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn diamond_prerequisite_runs_exactly_once() {
    init_tracing();
    let log = run_log();

    let mut reg = TaskRegistry::new();
    reg.register("base", vec![], recording(&log)).unwrap();
    reg.register("left", names(&["base"]), recording(&log)).unwrap();
    reg.register("right", names(&["base"]), recording(&log)).unwrap();
    reg.register("top", names(&["left", "right"]), recording(&log)).unwrap();
    let reg = Arc::new(reg);

    let report = with_timeout(reg.run("top")).await.unwrap();
    assert_eq!(report.outcome(), TaskOutcome::Success);

    let ran = entries(&log);
    assert_eq!(ran.iter().filter(|t| *t == "base").count(), 1);
    assert_eq!(ran.len(), 4);
    assert_eq!(ran.first().map(String::as_str), Some("base"));
    assert_eq!(ran.last().map(String::as_str), Some("top"));
}

#[tokio::test]
async fn chain_runs_prerequisites_in_order() {
    init_tracing();
    let log = run_log();

    let mut reg = TaskRegistry::new();
    reg.register("A", vec![], recording(&log)).unwrap();
    reg.register("B", names(&["A"]), recording(&log)).unwrap();
    reg.register("C", names(&["A", "B"]), recording(&log)).unwrap();
    let reg = Arc::new(reg);

    with_timeout(reg.run("C")).await.unwrap().into_result().unwrap();
    assert_eq!(entries(&log), names(&["A", "B", "C"]));
}

#[tokio::test]
async fn cycle_fails_before_any_action_runs() {
    init_tracing();
    let log = run_log();

    let mut reg = TaskRegistry::new();
    reg.register("seed", vec![], recording(&log)).unwrap();
    reg.register("X", names(&["seed", "Y"]), recording(&log)).unwrap();
    reg.register("Y", names(&["X"]), recording(&log)).unwrap();
    let reg = Arc::new(reg);

    let err = reg.run("X").await.unwrap_err();
    assert!(matches!(err, AssetflowError::Cycle(_)), "got {err:?}");
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn unknown_prerequisite_fails_at_resolution() {
    init_tracing();
    let log = run_log();

    let mut reg = TaskRegistry::new();
    reg.register("watch-server", names(&["serve"]), recording(&log)).unwrap();
    reg.register("pug", vec![], recording(&log)).unwrap();
    let reg = Arc::new(reg);

    // Tasks that don't reach the unknown name are unaffected.
    reg.run("pug").await.unwrap().into_result().unwrap();

    let err = reg.run("watch-server").await.unwrap_err();
    assert!(matches!(err, AssetflowError::UnknownPrerequisite { .. }));
    assert_eq!(entries(&log), names(&["pug"]));
}

#[tokio::test]
async fn independent_prerequisites_run_concurrently() {
    init_tracing();
    // Both prerequisites must be in flight at the same time to pass the
    // barrier; a sequential scheduler would hang here.
    let barrier = Arc::new(Barrier::new(2));

    let mut reg = TaskRegistry::new();
    for name in ["pug", "sass"] {
        let barrier = Arc::clone(&barrier);
        reg.register(
            name,
            vec![],
            action_fn(move |_ctx| {
                let barrier = Arc::clone(&barrier);
                async move {
                    barrier.wait().await;
                    Ok::<(), AssetflowError>(())
                }
            }),
        )
        .unwrap();
    }
    reg.register("compilation", names(&["pug", "sass"]), Arc::new(assetflow::dag::NoopAction))
        .unwrap();
    let reg = Arc::new(reg);

    let report = with_timeout(reg.run("compilation")).await.unwrap();
    assert_eq!(report.outcome(), TaskOutcome::Success);
}

#[tokio::test]
async fn failure_skips_dependents_but_not_siblings() {
    init_tracing();
    let log = run_log();

    let mut reg = TaskRegistry::new();
    reg.register(
        "broken",
        vec![],
        action_fn(|_ctx| async { Err::<(), _>(AssetflowError::FileSystem("disk full".into())) }),
    )
    .unwrap();
    reg.register("sibling", vec![], recording(&log)).unwrap();
    reg.register("after-broken", names(&["broken"]), recording(&log)).unwrap();
    reg.register("all", names(&["after-broken", "sibling"]), recording(&log)).unwrap();
    let reg = Arc::new(reg);

    let report = with_timeout(reg.run("all")).await.unwrap();
    assert_eq!(report.outcome(), TaskOutcome::Failed);
    assert_eq!(report.outcomes["sibling"], TaskRunState::DoneSuccess);
    assert_eq!(report.outcomes["after-broken"], TaskRunState::DoneFailed);
    assert_eq!(entries(&log), names(&["sibling"]));

    match report.into_result() {
        Err(AssetflowError::TaskFailed { task, failed }) => {
            assert_eq!(task, "all");
            assert_eq!(failed, names(&["after-broken", "all", "broken"]));
        }
        other => panic!("expected TaskFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn second_invocation_runs_everything_again() {
    init_tracing();
    let log = run_log();

    let mut reg = TaskRegistry::new();
    reg.register("A", vec![], recording(&log)).unwrap();
    reg.register("B", names(&["A"]), recording(&log)).unwrap();
    let reg = Arc::new(reg);

    reg.run("B").await.unwrap().into_result().unwrap();
    reg.run("B").await.unwrap().into_result().unwrap();
    assert_eq!(entries(&log), names(&["A", "B", "A", "B"]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_invocations_never_run_a_task_twice_at_once() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    init_tracing();
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let runs = Arc::new(AtomicUsize::new(0));

    let slow = {
        let (active, peak, runs) = (Arc::clone(&active), Arc::clone(&peak), Arc::clone(&runs));
        action_fn(move |_ctx| {
            let (active, peak, runs) = (Arc::clone(&active), Arc::clone(&peak), Arc::clone(&runs));
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                runs.fetch_add(1, Ordering::SeqCst);
                Ok::<(), AssetflowError>(())
            }
        })
    };

    let log = run_log();
    let mut reg = TaskRegistry::new();
    reg.register("lib", vec![], slow).unwrap();
    reg.register("app", names(&["lib"]), recording(&log)).unwrap();
    let reg = Arc::new(reg);

    let (a, b, c) = with_timeout(async {
        tokio::join!(reg.run("lib"), reg.run("lib"), reg.run("app"))
    })
    .await;

    for report in [a, b, c] {
        assert_eq!(report.unwrap().outcome(), TaskOutcome::Success);
    }
    assert_eq!(runs.load(Ordering::SeqCst), 3);
    assert_eq!(peak.load(Ordering::SeqCst), 1);
    assert_eq!(entries(&log), names(&["app"]));
}
