// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::GlobSet;

use crate::config::{ConfigFile, WatchConfig};
use crate::engine::TaskName;
use crate::fs::FileSystem;
use crate::pipeline::sources::build_globset;
use crate::types::ReloadKind;
use crate::watch::path_utils::relative_str;

/// Compiled `[watch.<name>]` binding: which paths, which tasks, which reload.
///
/// Patterns are relative to the project root; `*` does not cross `/`.
#[derive(Clone)]
pub struct WatchBinding {
    name: String,
    tasks: Vec<TaskName>,
    reload: ReloadKind,
    use_hash: bool,
    patterns: Vec<String>,
    watch_set: GlobSet,
    exclude_set: GlobSet,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("name", &self.name)
            .field("patterns", &self.patterns)
            .field("tasks", &self.tasks)
            .field("reload", &self.reload)
            .finish_non_exhaustive()
    }
}

impl WatchBinding {
    /// Compile a binding. `default_exclude` is appended to the binding's own
    /// excludes.
    pub fn from_config(name: &str, cfg: &WatchConfig, default_exclude: &[String]) -> Result<Self> {
        let mut exclude = cfg.exclude.clone();
        exclude.extend(default_exclude.iter().cloned());

        Ok(Self {
            name: name.to_string(),
            tasks: cfg.tasks.clone(),
            reload: cfg.reload,
            use_hash: cfg.use_hash,
            patterns: cfg.patterns.clone(),
            watch_set: build_globset(&cfg.patterns)
                .with_context(|| format!("building watch globset for binding {name}"))?,
            exclude_set: build_globset(&exclude)
                .with_context(|| format!("building exclude globset for binding {name}"))?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tasks(&self) -> &[TaskName] {
        &self.tasks
    }

    pub fn reload(&self) -> ReloadKind {
        self.reload
    }

    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    /// Whether a root-relative path (`"src/Main.elm"`) belongs to this
    /// binding.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.watch_set.is_match(rel_path) && !self.exclude_set.is_match(rel_path)
    }
}

/// Compile the named bindings from a validated task file.
pub fn build_bindings(cfg: &ConfigFile, names: &[String]) -> Result<Vec<WatchBinding>> {
    names
        .iter()
        .map(|name| {
            let binding = cfg
                .bindings()
                .get(name)
                .with_context(|| format!("unknown watch binding '{name}'"))?;
            WatchBinding::from_config(name, binding, &cfg.default_section().exclude)
        })
        .collect()
}

/// All files under `root` that belong to `binding`, sorted. Used for
/// `use_hash` fingerprints.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    binding: &WatchBinding,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            let Some(rel) = relative_str(root, &path) else {
                continue;
            };
            if fs.is_dir(&path) {
                if !binding.exclude_set.is_match(&rel) && !binding.exclude_set.is_match(format!("{rel}/")) {
                    stack.push(path);
                }
            } else if fs.is_file(&path) && binding.matches(&rel) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
