// src/watch/event_handler.rs

//! Turning a settled batch of changed paths into runtime events.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TaskName, TriggerReason};
use crate::fs::FileSystem;
use crate::types::ReloadKind;
use crate::watch::dag_filter::drop_implied;
use crate::watch::hash::{compute_aggregate_hash, HashStore};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{collect_matching_files, WatchBinding};

/// What one batch of changes asks the runtime to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeTriggers {
    /// Tasks to re-run, each with the reload to send once it succeeds.
    pub tasks: BTreeMap<TaskName, ReloadKind>,
    /// Reload requested by bindings that run no task.
    pub reload_only: ReloadKind,
}

impl ChangeTriggers {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.reload_only == ReloadKind::None
    }
}

/// Bindings matching at least one of `rel_paths`, in binding order.
pub fn matched_bindings<'a>(
    rel_paths: &[String],
    bindings: &'a [WatchBinding],
) -> Vec<&'a WatchBinding> {
    bindings
        .iter()
        .filter(|b| rel_paths.iter().any(|p| b.matches(p)))
        .collect()
}

/// Merge the matched bindings into per-task triggers.
///
/// A task named by several bindings runs once with the strongest reload.
/// Tasks that another triggered task already runs as a prerequisite are
/// dropped.
pub fn triggers_for_bindings(
    matched: &[&WatchBinding],
    dep_map: &HashMap<TaskName, Vec<TaskName>>,
) -> ChangeTriggers {
    let mut tasks: BTreeMap<TaskName, ReloadKind> = BTreeMap::new();
    let mut reload_only = ReloadKind::None;

    for binding in matched {
        if binding.tasks().is_empty() {
            reload_only = reload_only.merge(binding.reload());
            continue;
        }
        for task in binding.tasks() {
            let entry = tasks.entry(task.clone()).or_insert(ReloadKind::None);
            *entry = entry.merge(binding.reload());
        }
    }

    ChangeTriggers {
        tasks: drop_implied(tasks, dep_map),
        reload_only,
    }
}

/// [`matched_bindings`] followed by [`triggers_for_bindings`], for
/// bindings that don't use content hashes.
pub fn triggers_for_paths(
    rel_paths: &[String],
    bindings: &[WatchBinding],
    dep_map: &HashMap<TaskName, Vec<TaskName>>,
) -> ChangeTriggers {
    triggers_for_bindings(&matched_bindings(rel_paths, bindings), dep_map)
}

/// Shared state the watcher loop hands to [`process_changes`].
#[derive(Debug, Clone)]
pub struct ChangeContext {
    pub root: PathBuf,
    pub bindings: Arc<Vec<WatchBinding>>,
    pub dep_map: Arc<HashMap<TaskName, Vec<TaskName>>>,
    pub fs: Arc<dyn FileSystem>,
    pub hash_store: Arc<Mutex<HashStore>>,
}

/// Process one debounced batch of changed paths and send the resulting
/// events to the runtime.
///
/// Returns `false` once the runtime channel is closed.
pub async fn process_changes(
    ctx: &ChangeContext,
    paths: &[PathBuf],
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    let rel_paths: Vec<String> = paths
        .iter()
        .filter_map(|p| relative_str(&ctx.root, p))
        .collect();
    if rel_paths.is_empty() {
        return true;
    }

    let mut matched = Vec::new();
    for binding in matched_bindings(&rel_paths, &ctx.bindings) {
        if !binding.use_hash() || content_changed(ctx, binding).await {
            matched.push(binding);
        }
    }

    let triggers = triggers_for_bindings(&matched, &ctx.dep_map);
    if triggers.is_empty() {
        debug!(?rel_paths, "no binding fired for changed paths");
        return true;
    }

    info!(
        changed = rel_paths.len(),
        tasks = ?triggers.tasks.keys().collect::<Vec<_>>(),
        "change detected"
    );

    for (task, reload) in triggers.tasks {
        let event = RuntimeEvent::TaskTriggered {
            task,
            reload,
            reason: TriggerReason::FileWatch,
        };
        if let Err(err) = runtime_tx.send(event).await {
            warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
            return false;
        }
    }

    if triggers.reload_only != ReloadKind::None {
        let event = RuntimeEvent::ReloadRequested {
            kind: triggers.reload_only,
        };
        if let Err(err) = runtime_tx.send(event).await {
            warn!("failed to send RuntimeEvent::ReloadRequested: {err}");
            return false;
        }
    }

    true
}

/// Whether the aggregate content of `binding`'s files differs from the last
/// time it fired. Errors count as changed.
async fn content_changed(ctx: &ChangeContext, binding: &WatchBinding) -> bool {
    let root = ctx.root.clone();
    let fs = Arc::clone(&ctx.fs);
    let store = Arc::clone(&ctx.hash_store);
    let binding = binding.clone();

    tokio::task::spawn_blocking(move || {
        let hash = match fingerprint(fs.as_ref(), &root, &binding) {
            Ok(hash) => hash,
            Err(err) => {
                warn!(binding = %binding.name(), error = %err, "failed to hash watched files; triggering anyway");
                return true;
            }
        };

        let Ok(mut store) = store.lock() else {
            warn!("hash store mutex poisoned; triggering anyway");
            return true;
        };

        let changed = store.update(binding.name(), hash);
        if !changed {
            info!(binding = %binding.name(), "watched content unchanged; skipping");
        }
        changed
    })
    .await
    .unwrap_or(true)
}

/// Aggregate content hash of every file `binding` matches under `root`.
pub fn fingerprint(fs: &dyn FileSystem, root: &Path, binding: &WatchBinding) -> anyhow::Result<String> {
    let files = collect_matching_files(fs, root, binding)?;
    compute_aggregate_hash(fs, &files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WatchConfig;
    use crate::fs::mock::MockFileSystem;

    fn binding(name: &str, patterns: &[&str], tasks: &[&str], reload: ReloadKind) -> WatchBinding {
        let cfg = WatchConfig {
            patterns: patterns.iter().map(|s| s.to_string()).collect(),
            exclude: Vec::new(),
            tasks: tasks.iter().map(|s| s.to_string()).collect(),
            reload,
            use_hash: false,
        };
        WatchBinding::from_config(name, &cfg, &[]).unwrap()
    }

    fn dep_map(edges: &[(&str, Vec<&str>)]) -> HashMap<TaskName, Vec<TaskName>> {
        edges
            .iter()
            .map(|(t, deps)| (t.to_string(), deps.iter().map(|d| d.to_string()).collect()))
            .collect()
    }

    fn bindings() -> Vec<WatchBinding> {
        vec![
            binding("markup", &["**/*.pug"], &["pug"], ReloadKind::Full),
            binding("styles", &["**/*.scss"], &["sass"], ReloadKind::InjectStyles),
            binding("output", &["dist/**"], &[], ReloadKind::Full),
        ]
    }

    #[test]
    fn style_change_triggers_sass_with_inject() {
        let b = bindings();
        let matched = matched_bindings(&["src/main.scss".to_string()], &b);
        let triggers = triggers_for_bindings(&matched, &HashMap::new());

        assert_eq!(triggers.tasks.len(), 1);
        assert_eq!(triggers.tasks["sass"], ReloadKind::InjectStyles);
        assert_eq!(triggers.reload_only, ReloadKind::None);
    }

    #[test]
    fn mixed_batch_merges_and_keeps_reload_only_separate() {
        let b = bindings();
        let paths = vec![
            "index.pug".to_string(),
            "main.scss".to_string(),
            "dist/app.js".to_string(),
        ];
        let matched = matched_bindings(&paths, &b);
        let triggers = triggers_for_bindings(&matched, &HashMap::new());

        assert_eq!(triggers.tasks["pug"], ReloadKind::Full);
        assert_eq!(triggers.tasks["sass"], ReloadKind::InjectStyles);
        assert_eq!(triggers.reload_only, ReloadKind::Full);
    }

    #[test]
    fn prerequisite_trigger_is_folded_into_dependent() {
        let b = vec![
            binding("styles", &["**/*.scss"], &["sass"], ReloadKind::InjectStyles),
            binding("all", &["**/*.scss"], &["compilation"], ReloadKind::None),
        ];
        let deps = dep_map(&[("sass", vec![]), ("compilation", vec!["sass"])]);
        let matched = matched_bindings(&["a.scss".to_string()], &b);
        let triggers = triggers_for_bindings(&matched, &deps);

        assert_eq!(triggers.tasks.len(), 1);
        assert_eq!(triggers.tasks["compilation"], ReloadKind::InjectStyles);
    }

    #[tokio::test]
    async fn process_changes_sends_events() {
        let ctx = ChangeContext {
            root: PathBuf::from("/p"),
            bindings: Arc::new(bindings()),
            dep_map: Arc::new(HashMap::new()),
            fs: Arc::new(MockFileSystem::new()),
            hash_store: Arc::new(Mutex::new(HashStore::new())),
        };
        let (tx, mut rx) = mpsc::channel(8);

        let alive = process_changes(
            &ctx,
            &[PathBuf::from("/p/index.pug"), PathBuf::from("/elsewhere/x.pug")],
            &tx,
        )
        .await;
        assert!(alive);
        drop(tx);

        let mut events = Vec::new();
        while let Some(ev) = rx.recv().await {
            events.push(ev);
        }
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            RuntimeEvent::TaskTriggered { task, reload: ReloadKind::Full, reason: TriggerReason::FileWatch } if task == "pug"
        ));
    }

    #[tokio::test]
    async fn hashed_binding_skips_unchanged_content() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/p/main.scss", "body {}");

        let cfg = WatchConfig {
            patterns: vec!["*.scss".into()],
            exclude: Vec::new(),
            tasks: vec!["sass".into()],
            reload: ReloadKind::InjectStyles,
            use_hash: true,
        };
        let hashed = WatchBinding::from_config("styles", &cfg, &[]).unwrap();

        let mut store = HashStore::new();
        store.update("styles", fingerprint(fs.as_ref(), Path::new("/p"), &hashed).unwrap());

        let ctx = ChangeContext {
            root: PathBuf::from("/p"),
            bindings: Arc::new(vec![hashed]),
            dep_map: Arc::new(HashMap::new()),
            fs: fs.clone(),
            hash_store: Arc::new(Mutex::new(store)),
        };
        let (tx, mut rx) = mpsc::channel(8);
        let changed = [PathBuf::from("/p/main.scss")];

        assert!(process_changes(&ctx, &changed, &tx).await);
        assert!(rx.try_recv().is_err());

        fs.add_file("/p/main.scss", "body { color: red }");
        assert!(process_changes(&ctx, &changed, &tx).await);
        assert!(matches!(rx.try_recv(), Ok(RuntimeEvent::TaskTriggered { .. })));
    }
}
