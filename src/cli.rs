// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;
use crate::types::BuildMode;

/// Task run when none is named on the command line.
pub const DEFAULT_TASK: &str = "default";

/// Command-line arguments for `assetflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetflow",
    version,
    about = "Build web assets from a task graph and rebuild them on change.",
    long_about = None
)]
pub struct CliArgs {
    /// Tasks to run, one after another. Default: `default`.
    #[arg(value_name = "TASK")]
    pub tasks: Vec<String>,

    /// Build for production. Shorthand for `--mode production`.
    #[arg(long, conflicts_with = "mode")]
    pub production: bool,

    /// Build mode: `development` (default) or `production`.
    #[arg(long, value_name = "MODE")]
    pub mode: Option<BuildMode>,

    /// Path to the task file (TOML). Its directory is the project root.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate, then print what would run without running it.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    pub fn build_mode(&self) -> BuildMode {
        if self.production {
            BuildMode::Production
        } else {
            self.mode.unwrap_or_default()
        }
    }

    /// Requested tasks, or the default task.
    pub fn requested_tasks(&self) -> Vec<String> {
        if self.tasks.is_empty() {
            vec![DEFAULT_TASK.to_string()]
        } else {
            self.tasks.clone()
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_development_and_default_task() {
        let args = CliArgs::try_parse_from(["assetflow"]).unwrap();
        assert_eq!(args.build_mode(), BuildMode::Development);
        assert_eq!(args.requested_tasks(), vec!["default".to_string()]);
        assert_eq!(args.config, PathBuf::from("Assetflow.toml"));
    }

    #[test]
    fn production_flag_and_mode_option() {
        let args = CliArgs::try_parse_from(["assetflow", "build", "--production"]).unwrap();
        assert_eq!(args.build_mode(), BuildMode::Production);
        assert_eq!(args.requested_tasks(), vec!["build".to_string()]);

        let args = CliArgs::try_parse_from(["assetflow", "--mode", "prod"]).unwrap();
        assert_eq!(args.build_mode(), BuildMode::Production);
    }

    #[test]
    fn rejects_invalid_or_conflicting_modes() {
        assert!(CliArgs::try_parse_from(["assetflow", "--mode", "staging"]).is_err());
        assert!(CliArgs::try_parse_from([
            "assetflow",
            "--production",
            "--mode",
            "development"
        ])
        .is_err());
    }
}
