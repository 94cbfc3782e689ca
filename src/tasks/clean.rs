// src/tasks/clean.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use globset::GlobSet;
use tracing::{debug, info};

use crate::dag::{ActionFuture, TaskAction, TaskContext};
use crate::errors::{AssetflowError, Result};
use crate::fs::FileSystem;
use crate::pipeline::sources::{build_globset, glob_base};
use crate::watch::path_utils::relative_str;

/// Deletes every file or directory matching the given patterns, e.g.
/// `dist/*` before a production build.
#[derive(Debug, Clone)]
pub struct CleanAction {
    root: PathBuf,
    patterns: Arc<GlobSet>,
    bases: Vec<PathBuf>,
    fs: Arc<dyn FileSystem>,
}

impl CleanAction {
    pub fn new(root: PathBuf, patterns: &[String], fs: Arc<dyn FileSystem>) -> Result<Self> {
        let set = build_globset(patterns).map_err(|e| AssetflowError::StartupConfig(format!("{e:#}")))?;
        let mut bases: Vec<PathBuf> = patterns.iter().map(|p| root.join(glob_base(p))).collect();
        bases.sort();
        bases.dedup();

        Ok(Self {
            root,
            patterns: Arc::new(set),
            bases,
            fs,
        })
    }

    /// Remove matches and return what was removed.
    pub fn clean(&self) -> anyhow::Result<Vec<PathBuf>> {
        let mut removed = Vec::new();

        for base in self.bases.iter() {
            if !self.fs.is_dir(base) {
                continue;
            }

            let mut stack = vec![base.clone()];
            while let Some(dir) = stack.pop() {
                for path in self.fs.read_dir(&dir)? {
                    let Some(rel) = relative_str(&self.root, &path) else {
                        continue;
                    };
                    let is_dir = self.fs.is_dir(&path);

                    if self.patterns.is_match(&rel) {
                        let res = if is_dir {
                            self.fs.remove_dir_all(&path)
                        } else {
                            self.fs.remove_file(&path)
                        };
                        res.with_context(|| format!("cleaning {rel}"))?;
                        debug!(path = %rel, "removed");
                        removed.push(path);
                    } else if is_dir {
                        stack.push(path);
                    }
                }
            }
        }

        Ok(removed)
    }
}

impl TaskAction for CleanAction {
    fn run(&self, ctx: TaskContext) -> ActionFuture {
        let this = self.clone();
        Box::pin(async move {
            let removed = this
                .clean()
                .map_err(|e| AssetflowError::FileSystem(format!("task '{}': {e:#}", ctx.task)))?;
            info!(task = %ctx.task, removed = removed.len(), "cleaned");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn removes_contents_but_keeps_directory() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/dist/index.html", "x");
        fs.add_file("/p/dist/js/app.js", "y");
        fs.add_file("/p/src/app.js", "z");

        let clean = CleanAction::new(
            PathBuf::from("/p"),
            &["dist/*".to_string()],
            Arc::new(fs.clone()),
        )
        .unwrap();
        let mut removed = clean.clean().unwrap();
        removed.sort();

        assert_eq!(
            removed,
            vec![PathBuf::from("/p/dist/index.html"), PathBuf::from("/p/dist/js")]
        );
        assert!(fs.is_dir(std::path::Path::new("/p/dist")));
        assert!(fs.is_file(std::path::Path::new("/p/src/app.js")));
    }

    #[test]
    fn missing_directory_is_not_an_error() {
        let fs = MockFileSystem::new();
        fs.add_dir("/p");
        let clean = CleanAction::new(PathBuf::from("/p"), &["dist/*".to_string()], Arc::new(fs))
            .unwrap();
        assert!(clean.clean().unwrap().is_empty());
    }
}
