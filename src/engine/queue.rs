// src/engine/queue.rs

use std::collections::BTreeMap;

use tracing::debug;

use crate::engine::TaskName;
use crate::types::{ReloadKind, TriggerWhileRunningBehaviour};

/// Triggers that arrived while their task was already rebuilding.
///
/// Semantics:
/// - At most one pending re-run is kept per task. Any number of triggers
///   during one run coalesce into it, and their reload kinds are merged so
///   the strongest requested reload wins.
/// - In `Skip` mode nothing is remembered.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    pending: BTreeMap<TaskName, ReloadKind>,
}

impl TriggerQueue {
    pub fn new(behaviour: TriggerWhileRunningBehaviour) -> Self {
        Self {
            behaviour,
            pending: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, task: &str) -> bool {
        self.pending.contains_key(task)
    }

    /// Record a trigger for a running task. Returns whether it was kept.
    pub fn record_trigger(&mut self, task: &str, reload: ReloadKind) -> bool {
        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                let entry = self
                    .pending
                    .entry(task.to_string())
                    .or_insert(ReloadKind::None);
                *entry = entry.merge(reload);
                debug!(task = %task, reload = ?*entry, "coalesced trigger into pending re-run");
                true
            }
            TriggerWhileRunningBehaviour::Skip => {
                debug!(task = %task, "task already running; dropping trigger (skip mode)");
                false
            }
        }
    }

    /// Take the pending re-run for `task`, if any.
    pub fn take(&mut self, task: &str) -> Option<ReloadKind> {
        self.pending.remove(task)
    }

    /// Drop every pending re-run. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}
