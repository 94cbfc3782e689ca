// src/pipeline/runner.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::engine::TaskName;
use crate::errors::{AssetflowError, Result};
use crate::fs::FileSystem;
use crate::pipeline::record::{CompileError, FileRecord};
use crate::pipeline::sources::SourceSet;
use crate::pipeline::step::{steps_for, Step, StepSpec};
use crate::types::BuildMode;

/// Sources, an ordered list of steps and a destination.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub task: TaskName,
    pub sources: SourceSet,
    pub steps: Vec<Arc<dyn Step>>,
    /// Absolute destination directory.
    pub dest: PathBuf,
}

impl Pipeline {
    /// Build a pipeline whose steps are selected for `mode`.
    ///
    /// The destination directory is excluded from the source set so outputs
    /// are never fed back in.
    pub fn new(
        task: impl Into<TaskName>,
        sources: SourceSet,
        specs: &[StepSpec],
        mode: BuildMode,
        dest: PathBuf,
        cwd: &Path,
    ) -> Self {
        Self {
            task: task.into(),
            sources: sources.skip_dir(&dest),
            steps: steps_for(specs, mode, cwd),
            dest,
        }
    }
}

/// What one pipeline run did.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    /// Destination files whose contents changed.
    pub written: Vec<PathBuf>,
    /// Destination files that already had the produced contents.
    pub unchanged: Vec<PathBuf>,
    pub errors: Vec<CompileError>,
}

#[derive(Debug, Clone)]
pub struct PipelineRunner {
    fs: Arc<dyn FileSystem>,
}

impl PipelineRunner {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Read the sources, stream them through the steps and write whatever
    /// survives to the destination, replacing files of the same name.
    ///
    /// A source set that matches nothing, an unreadable source or an
    /// unwritable destination fails the run. Files that fail to compile are
    /// reported in [`PipelineReport::errors`] while the rest are written.
    pub async fn run(&self, pipeline: &Pipeline) -> Result<PipelineReport> {
        let task = pipeline.task.as_str();

        let sources = pipeline
            .sources
            .resolve(self.fs.as_ref())
            .map_err(|e| AssetflowError::FileSystem(format!("task '{task}': {e:#}")))?;

        if sources.is_empty() {
            return Err(AssetflowError::FileSystem(format!(
                "task '{task}': no source files match {:?}",
                pipeline.sources.patterns()
            )));
        }
        debug!(task = %task, files = sources.len(), "resolved sources");

        let mut records = Vec::with_capacity(sources.len());
        for src in sources {
            let contents = self.fs.read(&src.path).map_err(|e| {
                AssetflowError::FileSystem(format!("task '{task}': {e:#}"))
            })?;
            records.push(FileRecord::new(src.relative, src.path, contents));
        }

        let mut report = PipelineReport::default();
        for step in pipeline.steps.iter() {
            let out = step.apply(records).await?;
            report.errors.extend(out.errors);
            records = out.records;
        }

        for err in report.errors.iter() {
            error!(
                task = %task,
                file = %err.file.display(),
                step = %err.step,
                "compile error: {}",
                err.reason
            );
        }

        for record in records {
            let target = pipeline.dest.join(&record.path);
            if self.is_unchanged(&target, &record.contents) {
                report.unchanged.push(target);
                continue;
            }
            self.fs.write(&target, &record.contents).map_err(|e| {
                AssetflowError::FileSystem(format!("task '{task}': {e:#}"))
            })?;
            report.written.push(target);
        }

        info!(
            task = %task,
            written = report.written.len(),
            unchanged = report.unchanged.len(),
            errors = report.errors.len(),
            "pipeline finished"
        );
        Ok(report)
    }

    fn is_unchanged(&self, target: &Path, contents: &[u8]) -> bool {
        if !self.fs.is_file(target) {
            return false;
        }
        match self.fs.read(target) {
            Ok(existing) => blake3::hash(&existing) == blake3::hash(contents),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::pipeline::step::{StepFuture, StepOutput};
    use crate::types::StepCondition;

    /// Uppercases contents and renames to `.out`; rejects files containing
    /// "broken".
    #[derive(Debug)]
    struct Shout;

    impl Step for Shout {
        fn label(&self) -> &str {
            "shout"
        }

        fn apply(&self, records: Vec<FileRecord>) -> StepFuture<'_> {
            Box::pin(async move {
                let mut out = StepOutput::default();
                for mut r in records {
                    if r.contents.windows(6).any(|w| w == b"broken") {
                        out.errors.push(CompileError {
                            file: r.source,
                            step: "shout".into(),
                            reason: "cannot shout".into(),
                        });
                        continue;
                    }
                    r.contents = r.contents.to_ascii_uppercase();
                    r.set_extension("out");
                    out.records.push(r);
                }
                Ok(out)
            })
        }
    }

    fn pipeline(fs: &MockFileSystem) -> (PipelineRunner, Pipeline) {
        let sources = SourceSet::new("/p", &["src/*.txt".to_string()], &[]).unwrap();
        let mut p = Pipeline::new(
            "shout",
            sources,
            &[],
            BuildMode::Development,
            PathBuf::from("/p/dist"),
            Path::new("/p"),
        );
        p.steps.push(Arc::new(Shout));
        (PipelineRunner::new(Arc::new(fs.clone())), p)
    }

    #[tokio::test]
    async fn writes_transformed_files() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/a.txt", "hello");
        let (runner, p) = pipeline(&fs);

        let report = runner.run(&p).await.unwrap();
        assert_eq!(report.written, vec![PathBuf::from("/p/dist/a.out")]);
        assert_eq!(fs.contents("/p/dist/a.out").as_deref(), Some("HELLO"));
    }

    #[tokio::test]
    async fn unchanged_output_is_not_rewritten() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/a.txt", "hello");
        let (runner, p) = pipeline(&fs);

        runner.run(&p).await.unwrap();
        let second = runner.run(&p).await.unwrap();
        assert!(second.written.is_empty());
        assert_eq!(second.unchanged, vec![PathBuf::from("/p/dist/a.out")]);
    }

    #[tokio::test]
    async fn compile_errors_keep_other_outputs() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/a.txt", "fine");
        fs.add_file("/p/src/b.txt", "broken");
        let (runner, p) = pipeline(&fs);

        let report = runner.run(&p).await.unwrap();
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].file, PathBuf::from("/p/src/b.txt"));
        assert_eq!(fs.contents("/p/dist/a.out").as_deref(), Some("FINE"));
        assert!(fs.contents("/p/dist/b.out").is_none());
    }

    #[tokio::test]
    async fn empty_source_set_is_a_filesystem_error() {
        let fs = MockFileSystem::new();
        fs.add_dir("/p/src");
        let (runner, p) = pipeline(&fs);

        let err = runner.run(&p).await.unwrap_err();
        assert!(matches!(err, AssetflowError::FileSystem(ref m) if m.contains("no source files")));
    }

    #[tokio::test]
    async fn unwritable_destination_is_a_filesystem_error() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/a.txt", "hello");
        fs.make_read_only("/p/dist");
        let (runner, p) = pipeline(&fs);

        let err = runner.run(&p).await.unwrap_err();
        assert!(matches!(err, AssetflowError::FileSystem(_)));
    }

    #[test]
    fn mode_selects_steps_at_construction() {
        let specs = vec![StepSpec {
            condition: StepCondition::Production,
            kind: crate::pipeline::step::StepKind::Command {
                cmd: "uglifyjs".into(),
                rename_ext: None,
            },
        }];
        let sources = SourceSet::new("/p", &["*.js".to_string()], &[]).unwrap();
        let dev = Pipeline::new(
            "js",
            sources.clone(),
            &specs,
            BuildMode::Development,
            PathBuf::from("/p/dist"),
            Path::new("/p"),
        );
        let prod = Pipeline::new(
            "js",
            sources,
            &specs,
            BuildMode::Production,
            PathBuf::from("/p/dist"),
            Path::new("/p"),
        );
        assert!(dev.steps.is_empty());
        assert_eq!(prod.steps.len(), 1);
    }
}
