// src/tasks/mod.rs

//! Concrete task actions and the registry built from a task file.

pub mod clean;
pub mod command;
pub mod pipeline;
pub mod sequence;
pub mod serve;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use crate::config::{ActionConfig, ConfigFile};
use crate::dag::{NoopAction, TaskAction, TaskRegistry};
use crate::errors::{AssetflowError, Result};
use crate::exec::{parse_duration, Readiness};
use crate::fs::FileSystem;
use crate::pipeline::{Pipeline, PipelineRunner, SourceSet, StepSpec};
use crate::types::BuildMode;

pub use clean::CleanAction;
pub use command::CommandAction;
pub use pipeline::PipelineAction;
pub use sequence::SequenceAction;
pub use serve::{ServeAction, ServiceSet};
pub use watch::{WatchAction, WatchRequests};

/// Everything task construction depends on besides the task file.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub mode: BuildMode,
    /// Project root: the task file's directory. Relative paths resolve here.
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub services: ServiceSet,
    pub watch_requests: WatchRequests,
}

impl BuildContext {
    pub fn new(mode: BuildMode, root: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            mode,
            root,
            fs,
            services: ServiceSet::new(),
            watch_requests: WatchRequests::new(),
        }
    }
}

/// Register one task per `[task.<name>]` section.
pub fn build_registry(cfg: &ConfigFile, ctx: &BuildContext) -> Result<TaskRegistry> {
    let mut registry = TaskRegistry::new();
    let runner = PipelineRunner::new(Arc::clone(&ctx.fs));

    for (name, task) in cfg.tasks().iter() {
        let action = build_action(cfg, ctx, &runner, name, &task.action)?;
        registry.register(name.clone(), task.after.clone(), action)?;
    }

    debug!(tasks = cfg.tasks().len(), mode = %ctx.mode, "task registry built");
    Ok(registry)
}

fn build_action(
    cfg: &ConfigFile,
    ctx: &BuildContext,
    runner: &PipelineRunner,
    name: &str,
    action: &ActionConfig,
) -> Result<Arc<dyn TaskAction>> {
    let startup = |e: String| AssetflowError::StartupConfig(format!("task '{name}': {e}"));

    let action: Arc<dyn TaskAction> = match action {
        ActionConfig::Group => Arc::new(NoopAction),
        ActionConfig::Pipeline {
            src,
            exclude,
            steps,
            dest,
        } => {
            let mut excludes = exclude.clone();
            excludes.extend(cfg.default_section().exclude.iter().cloned());

            let sources = SourceSet::new(&ctx.root, src, &excludes).map_err(|e| startup(format!("{e:#}")))?;
            let specs: Vec<StepSpec> = steps.iter().map(StepSpec::from).collect();
            let dest = ctx
                .root
                .join(dest.as_deref().unwrap_or(cfg.config.dest.as_str()));

            let pipeline = Pipeline::new(name, sources, &specs, ctx.mode, dest, &ctx.root);
            Arc::new(PipelineAction::new(pipeline, runner.clone()))
        }
        ActionConfig::Clean { paths } => Arc::new(CleanAction::new(
            ctx.root.clone(),
            paths,
            Arc::clone(&ctx.fs),
        )?),
        ActionConfig::Command { cmd } => Arc::new(CommandAction::new(cmd.clone(), ctx.root.clone())),
        ActionConfig::Serve {
            cmd,
            ready_on_stdout,
            ready_after,
        } => {
            let readiness = Readiness {
                stdout_pattern: ready_on_stdout
                    .as_deref()
                    .map(Regex::new)
                    .transpose()
                    .map_err(|e| startup(e.to_string()))?,
                after: ready_after
                    .as_deref()
                    .map(parse_duration)
                    .transpose()
                    .map_err(startup)?,
            };
            Arc::new(ServeAction::new(
                cmd.clone(),
                ctx.root.clone(),
                readiness,
                ctx.services.clone(),
            ))
        }
        ActionConfig::Sequence { tasks } => Arc::new(SequenceAction::new(tasks.clone())),
        ActionConfig::Watch { bindings } => Arc::new(WatchAction::new(
            bindings.clone(),
            ctx.watch_requests.clone(),
        )),
    };

    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_from_str;
    use crate::fs::mock::MockFileSystem;

    fn config(toml: &str) -> ConfigFile {
        ConfigFile::try_from(load_from_str(toml).unwrap()).unwrap()
    }

    fn ctx(fs: &MockFileSystem) -> BuildContext {
        BuildContext::new(BuildMode::Development, PathBuf::from("/p"), Arc::new(fs.clone()))
    }

    #[test]
    fn registers_every_task_with_prerequisites() {
        let cfg = config(
            r#"
[task.del]
kind = "clean"
paths = ["dist/*"]

[task.compilation]
kind = "group"
after = ["pug", "sass"]

[task.pug]
kind = "command"
cmd = "true"

[task.sass]
kind = "command"
cmd = "true"
"#,
        );
        let reg = build_registry(&cfg, &ctx(&MockFileSystem::new())).unwrap();

        let names: Vec<&str> = reg.names().collect();
        assert_eq!(names, vec!["compilation", "del", "pug", "sass"]);
        assert_eq!(
            reg.prerequisites_of("compilation").unwrap(),
            &["pug".to_string(), "sass".to_string()]
        );
    }

    #[tokio::test]
    async fn pipeline_and_watch_tasks_run_through_registry() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/index.html", "<html></html>");
        fs.add_file("/p/src/app.js", "app()");

        let cfg = config(
            r#"
[task.copy]
kind = "pipeline"
src = ["index.html", "src/**/*.js"]

[task.watch]
kind = "watch"
after = ["copy"]
bindings = ["out"]

[watch.out]
patterns = ["dist/*.{js,html}"]
reload = "full"
"#,
        );
        let ctx = ctx(&fs);
        let reg = Arc::new(build_registry(&cfg, &ctx).unwrap());

        reg.run("watch").await.unwrap().into_result().unwrap();

        assert_eq!(fs.contents("/p/dist/index.html").as_deref(), Some("<html></html>"));
        assert_eq!(fs.contents("/p/dist/app.js").as_deref(), Some("app()"));
        assert_eq!(ctx.watch_requests.bindings(), vec!["out"]);
    }
}
