#![allow(dead_code)]

use std::collections::BTreeMap;

use assetflow::config::{
    ActionConfig, ConfigFile, ConfigSection, DefaultSection, RawConfigFile, ReloadSection,
    StepConfig, StepKindConfig, TaskConfig, WatchConfig,
};
use assetflow::types::{ReloadKind, StepCondition, TriggerWhileRunningBehaviour};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                default: DefaultSection::default(),
                reload: ReloadSection::default(),
                task: BTreeMap::new(),
                watch: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_binding(mut self, name: &str, binding: WatchConfig) -> Self {
        self.config.watch.insert(name.to_string(), binding);
        self
    }

    pub fn with_default_exclude(mut self, pattern: &str) -> Self {
        self.config.default.exclude.push(pattern.to_string());
        self
    }

    pub fn with_dest(mut self, dest: &str) -> Self {
        self.config.config.dest = dest.to_string();
        self
    }

    pub fn with_behaviour(mut self, behaviour: TriggerWhileRunningBehaviour) -> Self {
        self.config.config.triggered_while_running_behaviour = behaviour;
        self
    }

    /// The raw file, for tests that expect validation to fail.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    fn with_action(action: ActionConfig) -> Self {
        Self {
            task: TaskConfig {
                after: vec![],
                action,
            },
        }
    }

    pub fn group() -> Self {
        Self::with_action(ActionConfig::Group)
    }

    pub fn command(cmd: &str) -> Self {
        Self::with_action(ActionConfig::Command {
            cmd: cmd.to_string(),
        })
    }

    pub fn pipeline(src: &[&str]) -> Self {
        Self::with_action(ActionConfig::Pipeline {
            src: src.iter().map(|s| s.to_string()).collect(),
            exclude: vec![],
            steps: vec![],
            dest: None,
        })
    }

    pub fn clean(paths: &[&str]) -> Self {
        Self::with_action(ActionConfig::Clean {
            paths: paths.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn sequence(tasks: &[&str]) -> Self {
        Self::with_action(ActionConfig::Sequence {
            tasks: tasks.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn watch(bindings: &[&str]) -> Self {
        Self::with_action(ActionConfig::Watch {
            bindings: bindings.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    /// Append a pipeline step. Ignored for other task kinds.
    pub fn step(mut self, when: StepCondition, cmd: &str, rename_ext: Option<&str>) -> Self {
        if let ActionConfig::Pipeline { steps, .. } = &mut self.task.action {
            steps.push(StepConfig {
                when,
                kind: StepKindConfig::Command {
                    cmd: cmd.to_string(),
                    rename_ext: rename_ext.map(str::to_string),
                },
            });
        }
        self
    }

    pub fn concat(mut self, name: &str) -> Self {
        if let ActionConfig::Pipeline { steps, .. } = &mut self.task.action {
            steps.push(StepConfig {
                when: StepCondition::Always,
                kind: StepKindConfig::Concat {
                    name: name.to_string(),
                    separator: None,
                },
            });
        }
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// Builder for `WatchConfig`.
pub struct WatchConfigBuilder {
    binding: WatchConfig,
}

impl WatchConfigBuilder {
    pub fn new(pattern: &str) -> Self {
        Self {
            binding: WatchConfig {
                patterns: vec![pattern.to_string()],
                exclude: vec![],
                tasks: vec![],
                reload: ReloadKind::None,
                use_hash: false,
            },
        }
    }

    pub fn task(mut self, name: &str) -> Self {
        self.binding.tasks.push(name.to_string());
        self
    }

    pub fn reload(mut self, kind: ReloadKind) -> Self {
        self.binding.reload = kind;
        self
    }

    pub fn use_hash(mut self, val: bool) -> Self {
        self.binding.use_hash = val;
        self
    }

    pub fn build(self) -> WatchConfig {
        self.binding
    }
}
