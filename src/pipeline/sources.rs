// src/pipeline/sources.rs

//! Resolving a pipeline's source globs to files.
//!
//! Each include pattern has a *base*: its leading literal directories
//! (`src/styles` for `src/styles/**/*.scss`, empty for `*.pug`). A matched
//! file keeps its path relative to that base as its output path, so
//! `src/styles/a/b.scss` becomes `a/b.scss` under the destination.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

use crate::fs::FileSystem;
use crate::watch::path_utils::relative_str;

/// A matched source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the pattern's base; becomes the output path.
    pub relative: PathBuf,
}

#[derive(Debug, Clone)]
struct SourcePattern {
    matcher: GlobMatcher,
    base: PathBuf,
    /// Directory levels below `base` the pattern can reach; `None` for `**`.
    max_depth: Option<usize>,
}

/// Include and exclude globs, relative to a project root.
#[derive(Debug, Clone)]
pub struct SourceSet {
    root: PathBuf,
    patterns: Vec<String>,
    includes: Vec<SourcePattern>,
    exclude: GlobSet,
    /// Directories never descended into (the destination directory).
    skip: Vec<PathBuf>,
}

impl SourceSet {
    pub fn new(root: impl Into<PathBuf>, include: &[String], exclude: &[String]) -> Result<Self> {
        let mut includes = Vec::with_capacity(include.len());
        for pattern in include {
            includes.push(compile_include(pattern)?);
        }

        Ok(Self {
            root: root.into(),
            patterns: include.to_vec(),
            includes,
            exclude: build_globset(exclude)?,
            skip: Vec::new(),
        })
    }

    /// Never read files below `dir` (absolute or relative to the root).
    pub fn skip_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.skip.push(self.root.join(dir));
        self
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Every matching file, sorted by path. A file matched by several
    /// patterns is reported once, under the first pattern's base.
    pub fn resolve(&self, fs: &dyn FileSystem) -> Result<Vec<SourceFile>> {
        let mut found: BTreeMap<PathBuf, SourceFile> = BTreeMap::new();

        for pattern in self.includes.iter() {
            let start = self.root.join(&pattern.base);
            if !fs.is_dir(&start) {
                continue;
            }

            let mut stack = vec![(start.clone(), 0usize)];
            while let Some((dir, depth)) = stack.pop() {
                let entries = fs
                    .read_dir(&dir)
                    .with_context(|| format!("listing sources in {:?}", dir))?;

                for path in entries {
                    if self.skip.iter().any(|s| path.starts_with(s)) {
                        continue;
                    }
                    let Some(rel) = relative_str(&self.root, &path) else {
                        continue;
                    };

                    if fs.is_dir(&path) {
                        let reachable = pattern.max_depth.is_none_or(|max| depth + 1 < max);
                        if reachable && !self.excludes_dir(&rel) {
                            stack.push((path, depth + 1));
                        }
                    } else if fs.is_file(&path)
                        && pattern.matcher.is_match(&rel)
                        && !self.exclude.is_match(&rel)
                        && !found.contains_key(&path)
                    {
                        let relative = path.strip_prefix(&start).unwrap_or(&path).to_path_buf();
                        found.insert(path.clone(), SourceFile { path, relative });
                    }
                }
            }
        }

        Ok(found.into_values().collect())
    }

    /// Whether an exclude pattern covers everything below `rel_dir`
    /// (`node_modules/**`).
    fn excludes_dir(&self, rel_dir: &str) -> bool {
        self.exclude.is_match(rel_dir) || self.exclude.is_match(format!("{rel_dir}/"))
    }
}

fn compile_include(pattern: &str) -> Result<SourcePattern> {
    let path = Path::new(pattern);
    if path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        bail!("source pattern '{pattern}' must stay inside the project root");
    }

    let parts = pattern_parts(pattern);
    let literal = literal_prefix_len(&parts);

    let base: PathBuf = parts[..literal].iter().collect();
    let rest = &parts[literal..];
    let max_depth = if rest.iter().any(|p| p.contains("**")) {
        None
    } else {
        Some(rest.len())
    };

    let matcher = GlobBuilder::new(&parts.join("/"))
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))?
        .compile_matcher();

    Ok(SourcePattern {
        matcher,
        base,
        max_depth,
    })
}

/// Leading literal directories of a glob pattern (`dist` for `dist/*`).
pub(crate) fn glob_base(pattern: &str) -> PathBuf {
    let parts = pattern_parts(pattern);
    parts[..literal_prefix_len(&parts)].iter().collect()
}

fn pattern_parts(pattern: &str) -> Vec<&str> {
    pattern
        .split('/')
        .filter(|p| !p.is_empty() && *p != ".")
        .collect()
}

/// Number of leading components without glob syntax. The last component
/// names the files themselves and never counts.
fn literal_prefix_len(parts: &[&str]) -> usize {
    parts
        .iter()
        .take(parts.len().saturating_sub(1))
        .take_while(|p| !has_glob_meta(p))
        .count()
}

fn has_glob_meta(part: &str) -> bool {
    part.contains(['*', '?', '[', '{'])
}

pub(crate) fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
