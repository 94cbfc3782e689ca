// tests/watcher_debounce.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, TaskConfigBuilder, WatchConfigBuilder};
use crate::common::init_tracing;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use assetflow::engine::RuntimeEvent;
use assetflow::fs::{FileSystem, RealFileSystem};
use assetflow::types::ReloadKind;
use assetflow::watch::{build_bindings, spawn_watcher};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

#[tokio::test]
async fn burst_of_writes_triggers_one_run() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let styles = dir.path().join("styles");
    std::fs::create_dir_all(&styles).unwrap();
    let file = styles.join("site.style");
    std::fs::write(&file, "body {}").unwrap();

    let cfg = ConfigFileBuilder::new()
        .with_task("sass", TaskConfigBuilder::command("sass").build())
        .with_binding(
            "styles",
            WatchConfigBuilder::new("**/*.style")
                .task("sass")
                .reload(ReloadKind::InjectStyles)
                .build(),
        )
        .build();
    let bindings = build_bindings(&cfg, &["styles".to_string()]).unwrap();

    let (tx, mut rx) = mpsc::channel::<RuntimeEvent>(16);
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let _watcher = spawn_watcher(
        dir.path(),
        bindings,
        HashMap::new(),
        Duration::from_millis(250),
        tx,
        fs,
    )
    .unwrap();
    sleep(Duration::from_millis(200)).await;

    for i in 0..5 {
        std::fs::write(&file, format!("body {{ margin: {i}px }}")).unwrap();
        sleep(Duration::from_millis(10)).await;
    }

    let first = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no trigger after the writes")
        .expect("watcher channel closed");
    match first {
        RuntimeEvent::TaskTriggered { task, reload, .. } => {
            assert_eq!(task, "sass");
            assert_eq!(reload, ReloadKind::InjectStyles);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let extra = timeout(Duration::from_millis(800), rx.recv()).await;
    assert!(extra.is_err(), "burst produced a second event: {extra:?}");
}
