// src/watch/watcher.rs

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TaskName};
use crate::fs::FileSystem;
use crate::watch::event_handler::{fingerprint, process_changes, ChangeContext};
use crate::watch::hash::HashStore;
use crate::watch::patterns::WatchBinding;

/// Handle for the filesystem watcher.
///
/// Dropping it stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `root` recursively and feed settled batches of changes to the
/// runtime as `TaskTriggered` / `ReloadRequested` events.
///
/// Events are collected until no new one arrived for `debounce`, so an
/// editor's save burst becomes one batch.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    bindings: Vec<WatchBinding>,
    dep_map: HashMap<TaskName, Vec<TaskName>>,
    debounce: Duration,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    fs: Arc<dyn FileSystem>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    let mut hash_store = HashStore::new();
    for binding in bindings.iter().filter(|b| b.use_hash()) {
        match fingerprint(fs.as_ref(), &root, binding) {
            Ok(hash) => {
                hash_store.update(binding.name(), hash);
            }
            Err(err) => warn!(binding = %binding.name(), error = %err, "failed to prime content hash"),
        }
    }

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("assetflow: failed to forward notify event: {err}");
                }
            }
            Err(err) => eprintln!("assetflow: file watch error: {err}"),
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    let names: Vec<&str> = bindings.iter().map(|b| b.name()).collect();
    info!(root = ?root, bindings = ?names, "file watcher started");

    let ctx = ChangeContext {
        root,
        bindings: Arc::new(bindings),
        dep_map: Arc::new(dep_map),
        fs,
        hash_store: Arc::new(Mutex::new(hash_store)),
    };

    tokio::spawn(async move {
        while let Some(first) = event_rx.recv().await {
            let mut paths: BTreeSet<PathBuf> = BTreeSet::new();
            collect_paths(first, &mut paths);

            // Keep draining until the filesystem has been quiet for `debounce`.
            loop {
                match timeout(debounce, event_rx.recv()).await {
                    Ok(Some(event)) => collect_paths(event, &mut paths),
                    Ok(None) => break,
                    Err(_) => break,
                }
            }

            if paths.is_empty() {
                continue;
            }

            let paths: Vec<PathBuf> = paths.into_iter().collect();
            debug!(?paths, "settled change batch");

            if !process_changes(&ctx, &paths, &runtime_tx).await {
                break;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}

fn collect_paths(event: Event, into: &mut BTreeSet<PathBuf>) {
    // Reads and opens don't change anything on disk.
    if matches!(event.kind, EventKind::Access(_)) {
        return;
    }
    into.extend(event.paths);
}
