// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{ReloadKind, StepCondition, TriggerWhileRunningBehaviour};

/// Top-level task file as read from TOML, before validation.
///
/// ```toml
/// [config]
/// dest = "dist"
///
/// [default]
/// exclude = ["node_modules/**"]
///
/// [reload]
/// full_cmd = "browser-sync reload"
///
/// [task.pug]
/// kind = "pipeline"
/// src = ["index.pug"]
///
/// [[task.pug.steps]]
/// kind = "command"
/// cmd = "pug --pretty"
/// rename_ext = "html"
///
/// [watch.markup]
/// patterns = ["*.pug"]
/// tasks = ["pug"]
/// reload = "full"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub default: DefaultSection,

    #[serde(default)]
    pub reload: ReloadSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// All watch bindings from `[watch.<name>]`, keyed by binding name.
    #[serde(default)]
    pub watch: BTreeMap<String, WatchConfig>,
}

/// A task file that passed [`crate::config::validate`].
///
/// Only constructible through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub default: DefaultSection,
    pub reload: ReloadSection,
    pub task: BTreeMap<String, TaskConfig>,
    pub watch: BTreeMap<String, WatchConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            default: raw.default,
            reload: raw.reload,
            task: raw.task,
            watch: raw.watch,
        }
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.task
    }

    pub fn bindings(&self) -> &BTreeMap<String, WatchConfig> {
        &self.watch
    }

    pub fn default_section(&self) -> &DefaultSection {
        &self.default
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Destination directory for pipeline output, relative to the project
    /// root.
    #[serde(default = "default_dest")]
    pub dest: String,

    /// How long the watcher waits for the filesystem to settle before
    /// treating a burst of events as one change.
    #[serde(default = "default_debounce")]
    pub debounce: String,

    /// `"queue"` (default) or `"skip"`.
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,
}

fn default_dest() -> String {
    "dist".to_string()
}

fn default_debounce() -> String {
    "100ms".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            dest: default_dest(),
            debounce: default_debounce(),
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
        }
    }
}

/// `[default]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefaultSection {
    /// Exclude patterns applied to every pipeline source set and watch
    /// binding, on top of their own `exclude` lists.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// `[reload]` section: how the external live-reload transport is reached.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ReloadSection {
    /// Command run for a full page reload.
    #[serde(default)]
    pub full_cmd: Option<String>,

    /// Command run to swap stylesheets in place.
    #[serde(default)]
    pub inject_cmd: Option<String>,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Prerequisites: tasks that must complete before this one runs.
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(flatten)]
    pub action: ActionConfig,
}

/// What a task does, selected by its `kind` key.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ActionConfig {
    /// No action of its own; only runs its prerequisites.
    Group,

    /// Stream matched source files through an ordered list of steps into
    /// the destination directory.
    Pipeline {
        src: Vec<String>,
        #[serde(default)]
        exclude: Vec<String>,
        #[serde(default)]
        steps: Vec<StepConfig>,
        /// Overrides `[config].dest` for this pipeline.
        #[serde(default)]
        dest: Option<String>,
    },

    /// Delete files and directories matching the given patterns.
    Clean { paths: Vec<String> },

    /// Run a shell command once.
    Command { cmd: String },

    /// Start a long-lived process (dev server, reload server).
    Serve {
        cmd: String,
        /// Regex; the task completes once a stdout line matches.
        #[serde(default)]
        ready_on_stdout: Option<String>,
        /// Duration string (e.g. `"2s"`); the task completes after it elapses.
        #[serde(default)]
        ready_after: Option<String>,
    },

    /// Run other tasks one after another, each to completion.
    Sequence { tasks: Vec<String> },

    /// Enter the watch/rebuild loop for the named `[watch.*]` bindings once
    /// the requested tasks finished.
    Watch { bindings: Vec<String> },
}

/// One `[[task.<name>.steps]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    #[serde(default)]
    pub when: StepCondition,

    #[serde(flatten)]
    pub kind: StepKindConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StepKindConfig {
    /// Pipe each file through an external command (stdin -> stdout).
    Command {
        cmd: String,
        /// Replace the file extension of each output (e.g. `"css"`).
        #[serde(default)]
        rename_ext: Option<String>,
    },
    /// Join every file into a single output file.
    Concat {
        name: String,
        #[serde(default)]
        separator: Option<String>,
    },
}

/// `[watch.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    pub patterns: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    /// Tasks re-run when a matching path changes. May be empty for bindings
    /// that only reload (e.g. watching the output directory).
    #[serde(default)]
    pub tasks: Vec<String>,

    #[serde(default)]
    pub reload: ReloadKind,

    /// Only fire when the contents of the matched files actually changed.
    #[serde(default)]
    pub use_hash: bool,
}
