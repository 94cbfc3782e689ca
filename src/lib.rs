// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod reload;
pub mod tasks;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, ActionConfig, ConfigFile};
use crate::dag::{ExecutionPlan, TaskRegistry};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent};
use crate::exec::{parse_duration, RegistryExecutor};
use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::StepSpec;
use crate::reload::ReloadChannel;
use crate::tasks::{build_registry, BuildContext};
use crate::types::BuildMode;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - task file loading and the task registry
/// - the one-shot run of the requested tasks
/// - (when a `watch` task ran) the file watcher, runtime and reload channel
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;
    let mode = args.build_mode();
    let root = config_root_dir(&args.config);

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let ctx = BuildContext::new(mode, root, fs);
    let registry = Arc::new(build_registry(&cfg, &ctx)?);

    // Resolve every requested task before running any of them, so unknown
    // tasks and cycles abort without side effects.
    let tasks = args.requested_tasks();
    let plans = tasks
        .iter()
        .map(|t| registry.plan(t))
        .collect::<errors::Result<Vec<_>>>()?;

    if args.dry_run {
        print_dry_run(&cfg, &plans, mode);
        return Ok(());
    }

    info!(%mode, ?tasks, root = ?ctx.root, "starting");

    let failures = run_requested(&registry, &tasks).await?;

    if !ctx.watch_requests.is_empty() {
        return run_watch_loop(&cfg, &ctx, registry).await;
    }

    let services = ctx.services.running().await;
    if !services.is_empty() {
        info!(?services, "services running; press Ctrl-C to stop");
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {e}");
        }
        ctx.services.shutdown().await;
    }

    match failures.into_iter().next() {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

/// Run each requested task to completion, in order.
///
/// Task failures are logged and collected; only errors that prevent a run
/// from starting are returned.
async fn run_requested(
    registry: &Arc<TaskRegistry>,
    tasks: &[String],
) -> Result<Vec<errors::AssetflowError>> {
    let mut failures = Vec::new();

    for task in tasks {
        let report = registry.run(task).await?;
        if let Err(err) = report.into_result() {
            error!(task = %task, error = %err, "task did not succeed");
            failures.push(err);
        }
    }

    Ok(failures)
}

/// Run the watch/rebuild loop until Ctrl-C.
async fn run_watch_loop(cfg: &ConfigFile, ctx: &BuildContext, registry: Arc<TaskRegistry>) -> Result<()> {
    let bindings = watch::build_bindings(cfg, &ctx.watch_requests.bindings())?;
    let debounce = parse_duration(&cfg.config.debounce).map_err(|e| anyhow!(e))?;

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let _watcher = watch::spawn_watcher(
        &ctx.root,
        bindings,
        registry.graph().prerequisite_map(),
        debounce,
        rt_tx.clone(),
        Arc::clone(&ctx.fs),
    )?;

    // Ctrl-C -> graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let executor = RegistryExecutor::new(registry, rt_tx);
    let reload = ReloadChannel::new(&cfg.reload, ctx.root.clone());
    let core = CoreRuntime::new(cfg.config.triggered_while_running_behaviour);

    let result = Runtime::new(core, rt_rx, executor, reload).run().await;
    ctx.services.shutdown().await;
    Ok(result?)
}

/// The project root is the task file's directory.
///
/// A bare file name like `Assetflow.toml` (parent = "") means the current
/// working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Print each requested task's execution order and the steps its
/// pipelines would run in `mode`.
fn print_dry_run(cfg: &ConfigFile, plans: &[ExecutionPlan], mode: BuildMode) {
    println!("assetflow dry-run ({mode})");

    for plan in plans {
        println!();
        println!("{}:", plan.root);
        for (i, name) in plan.order.iter().enumerate() {
            let deps = plan.deps_of(name);
            if deps.is_empty() {
                println!("  {}. {name}", i + 1);
            } else {
                println!("  {}. {name} (after {})", i + 1, deps.join(", "));
            }

            let Some(task) = cfg.tasks().get(name) else {
                continue;
            };
            match &task.action {
                ActionConfig::Pipeline { src, steps, .. } => {
                    println!("       src: {}", src.join(", "));
                    for spec in steps.iter().map(StepSpec::from) {
                        if spec.condition.applies_to(mode) {
                            println!("       | {}", spec.describe());
                        }
                    }
                }
                ActionConfig::Command { cmd } | ActionConfig::Serve { cmd, .. } => {
                    println!("       $ {cmd}");
                }
                ActionConfig::Clean { paths } => println!("       clean: {}", paths.join(", ")),
                ActionConfig::Sequence { tasks } => println!("       then: {}", tasks.join(" -> ")),
                ActionConfig::Watch { bindings } => println!("       watch: {}", bindings.join(", ")),
                ActionConfig::Group => {}
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
