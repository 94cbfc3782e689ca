// src/watch/dag_filter.rs

//! Prerequisite-aware filtering of watch triggers.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::engine::TaskName;
use crate::types::ReloadKind;

/// Return true if `task` has any ancestor (transitive prerequisite) whose
/// name is in `candidates`.
pub fn has_ancestor_in(
    task: &str,
    candidates: &HashSet<&str>,
    dep_map: &HashMap<TaskName, Vec<TaskName>>,
) -> bool {
    let mut stack: Vec<&str> = dep_map
        .get(task)
        .map(|deps| deps.iter().map(String::as_str).collect())
        .unwrap_or_default();
    let mut visited: HashSet<&str> = HashSet::new();

    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        if candidates.contains(current) {
            return true;
        }
        if let Some(parents) = dep_map.get(current) {
            stack.extend(parents.iter().map(String::as_str));
        }
    }

    false
}

/// Drop triggered tasks that another triggered task already runs as a
/// prerequisite. The dropped task's reload is folded into every task that
/// implies it, so no requested reload is lost.
pub fn drop_implied(
    triggered: BTreeMap<TaskName, ReloadKind>,
    dep_map: &HashMap<TaskName, Vec<TaskName>>,
) -> BTreeMap<TaskName, ReloadKind> {
    let mut kept: BTreeMap<TaskName, ReloadKind> = BTreeMap::new();
    let mut implied: Vec<(&str, ReloadKind)> = Vec::new();

    for (task, reload) in triggered.iter() {
        let me: HashSet<&str> = HashSet::from([task.as_str()]);
        let is_implied = triggered
            .keys()
            .any(|other| other != task && has_ancestor_in(other, &me, dep_map));
        if is_implied {
            implied.push((task.as_str(), *reload));
        } else {
            kept.insert(task.clone(), *reload);
        }
    }

    for (task, reload) in implied {
        let me: HashSet<&str> = HashSet::from([task]);
        for (other, other_reload) in kept.iter_mut() {
            if has_ancestor_in(other, &me, dep_map) {
                *other_reload = other_reload.merge(reload);
            }
        }
    }

    kept
}
