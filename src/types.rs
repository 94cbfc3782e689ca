use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Development vs production build.
///
/// Chosen once at process start from the command line and then passed by
/// value into every task and pipeline constructor. Nothing reads it from
/// global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Development,
    Production,
}

impl Default for BuildMode {
    fn default() -> Self {
        BuildMode::Development
    }
}

impl BuildMode {
    pub fn is_production(self) -> bool {
        matches!(self, BuildMode::Production)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Development => f.write_str("development"),
            BuildMode::Production => f.write_str("production"),
        }
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(BuildMode::Development),
            "production" | "prod" => Ok(BuildMode::Production),
            other => Err(format!(
                "invalid build mode: {other} (expected \"development\" or \"production\")"
            )),
        }
    }
}

/// When a pipeline step applies.
///
/// `production` steps are typically minifiers; `development` steps are
/// typically source-map or debug variants of a compiler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepCondition {
    Always,
    Production,
    Development,
}

impl Default for StepCondition {
    fn default() -> Self {
        StepCondition::Always
    }
}

impl StepCondition {
    pub fn applies_to(self, mode: BuildMode) -> bool {
        match self {
            StepCondition::Always => true,
            StepCondition::Production => mode == BuildMode::Production,
            StepCondition::Development => mode == BuildMode::Development,
        }
    }
}

/// What connected browsers should do after a rebuild.
///
/// Ordered from weakest to strongest, so merging two requests is `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub enum ReloadKind {
    #[serde(rename = "none")]
    None,
    /// Swap stylesheets in place without reloading the page.
    #[serde(rename = "inject")]
    InjectStyles,
    #[serde(rename = "full")]
    Full,
}

impl Default for ReloadKind {
    fn default() -> Self {
        ReloadKind::None
    }
}

impl ReloadKind {
    pub fn merge(self, other: ReloadKind) -> ReloadKind {
        self.max(other)
    }
}

/// Behaviour when a watch trigger arrives for a task that is already
/// rebuilding.
///
/// - `Queue`: remember it and run the task once more after the current run
///   finishes. Any number of triggers during one run coalesce into a single
///   re-run (default).
/// - `Skip`: drop the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    Queue,
    Skip,
}

impl Default for TriggerWhileRunningBehaviour {
    fn default() -> Self {
        TriggerWhileRunningBehaviour::Queue
    }
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "skip" => Ok(TriggerWhileRunningBehaviour::Skip),
            other => Err(format!(
                "invalid triggered_while_running_behaviour: {other} (expected \"queue\" or \"skip\")"
            )),
        }
    }
}
