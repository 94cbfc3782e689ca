// src/config/validate.rs

use std::sync::OnceLock;

use globset::Glob;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use regex::Regex;

use crate::config::model::{ActionConfig, ConfigFile, RawConfigFile};
use crate::errors::{AssetflowError, Result};
use crate::exec::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AssetflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn task_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.:-]*$").expect("task name regex is valid")
    })
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_task_names(cfg)?;
    validate_task_actions(cfg)?;
    validate_watch_bindings(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> AssetflowError {
    AssetflowError::StartupConfig(msg.into())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(config_error(
            "task file must contain at least one [task.<name>] section",
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.dest.trim().is_empty() {
        return Err(config_error("[config].dest must not be empty"));
    }
    parse_duration(&cfg.config.debounce)
        .map_err(|e| config_error(format!("[config].debounce: {e}")))?;
    check_globs("[default].exclude", &cfg.default.exclude)?;
    Ok(())
}

fn validate_task_names(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if !task_name_regex().is_match(name) {
            return Err(config_error(format!(
                "invalid task name '{name}' (letters, digits, '_', '.', ':', '-')"
            )));
        }
        if task.after.iter().any(|dep| dep == name) {
            return Err(config_error(format!(
                "task '{name}' cannot depend on itself in `after`"
            )));
        }
    }
    Ok(())
}

fn validate_task_actions(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        match &task.action {
            ActionConfig::Pipeline { src, exclude, .. } => {
                if src.is_empty() {
                    return Err(config_error(format!(
                        "pipeline task '{name}' needs at least one `src` pattern"
                    )));
                }
                check_globs(&format!("task '{name}' src"), src)?;
                check_globs(&format!("task '{name}' exclude"), exclude)?;
            }
            ActionConfig::Clean { paths } => {
                check_globs(&format!("task '{name}' paths"), paths)?;
            }
            ActionConfig::Serve {
                ready_on_stdout,
                ready_after,
                ..
            } => {
                if let Some(pattern) = ready_on_stdout {
                    Regex::new(pattern).map_err(|e| {
                        config_error(format!("task '{name}' ready_on_stdout: {e}"))
                    })?;
                }
                if let Some(dur) = ready_after {
                    parse_duration(dur)
                        .map_err(|e| config_error(format!("task '{name}' ready_after: {e}")))?;
                }
            }
            ActionConfig::Sequence { tasks } => {
                if tasks.iter().any(|t| t == name) {
                    return Err(config_error(format!(
                        "sequence task '{name}' cannot run itself"
                    )));
                }
            }
            ActionConfig::Watch { bindings } => {
                for binding in bindings {
                    if !cfg.watch.contains_key(binding) {
                        return Err(config_error(format!(
                            "watch task '{name}' references unknown binding '{binding}'"
                        )));
                    }
                }
            }
            ActionConfig::Group | ActionConfig::Command { .. } => {}
        }
    }
    Ok(())
}

fn validate_watch_bindings(cfg: &RawConfigFile) -> Result<()> {
    for (name, binding) in cfg.watch.iter() {
        if binding.patterns.is_empty() {
            return Err(config_error(format!(
                "watch binding '{name}' needs at least one pattern"
            )));
        }
        check_globs(&format!("watch binding '{name}' patterns"), &binding.patterns)?;
        check_globs(&format!("watch binding '{name}' exclude"), &binding.exclude)?;
        for task in binding.tasks.iter() {
            if !cfg.task.contains_key(task) {
                return Err(config_error(format!(
                    "watch binding '{name}' references unknown task '{task}'"
                )));
            }
        }
    }
    Ok(())
}

fn check_globs(what: &str, patterns: &[String]) -> Result<()> {
    for pattern in patterns {
        Glob::new(pattern)
            .map_err(|e| config_error(format!("{what}: invalid glob '{pattern}': {e}")))?;
    }
    Ok(())
}

/// Reject cycles among known tasks.
///
/// Edges are `prerequisite -> task` for `after` lists and `task -> member`
/// for sequence members, since a sequence runs its members while holding its
/// own turn. References to undefined tasks are skipped here; they fail when
/// the referencing task is resolved.
fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if cfg.task.contains_key(dep) {
                graph.add_edge(dep.as_str(), name.as_str(), ());
            }
        }
        if let ActionConfig::Sequence { tasks } = &task.action {
            for member in tasks.iter() {
                if cfg.task.contains_key(member) {
                    graph.add_edge(member.as_str(), name.as_str(), ());
                }
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(AssetflowError::Cycle(cycle.node_id().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::load_from_str;

    fn validate_str(toml: &str) -> Result<ConfigFile> {
        ConfigFile::try_from(load_from_str(toml)?)
    }

    #[test]
    fn accepts_unknown_prerequisite_until_resolution() {
        let cfg = validate_str(
            r#"
[task.watch-server]
kind = "group"
after = ["serve"]
"#,
        );
        assert!(cfg.is_ok(), "unknown prerequisites are resolved lazily");
    }

    #[test]
    fn rejects_cycle_through_after() {
        let err = validate_str(
            r#"
[task.a]
kind = "group"
after = ["b"]

[task.b]
kind = "group"
after = ["a"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, AssetflowError::Cycle(_)), "got {err:?}");
    }

    #[test]
    fn rejects_cycle_through_sequence() {
        let err = validate_str(
            r#"
[task.build]
kind = "sequence"
tasks = ["compile"]

[task.compile]
kind = "group"
after = ["build"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, AssetflowError::Cycle(_)), "got {err:?}");
    }

    #[test]
    fn rejects_bad_task_names_and_globs() {
        let err = validate_str(
            r#"
[task."bad name"]
kind = "group"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, AssetflowError::StartupConfig(ref m) if m.contains("invalid task name")));

        let err = validate_str(
            r#"
[task.sass]
kind = "pipeline"
src = ["**/*.{scss"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, AssetflowError::StartupConfig(ref m) if m.contains("invalid glob")));
    }

    #[test]
    fn rejects_watch_binding_with_unknown_task() {
        let err = validate_str(
            r#"
[task.watch]
kind = "watch"
bindings = ["styles"]

[watch.styles]
patterns = ["**/*.scss"]
tasks = ["sass"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, AssetflowError::StartupConfig(ref m) if m.contains("unknown task 'sass'")));
    }

    #[test]
    fn rejects_bad_debounce() {
        let err = validate_str(
            r#"
[config]
debounce = "soon"

[task.a]
kind = "group"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, AssetflowError::StartupConfig(ref m) if m.contains("debounce")));
    }
}
