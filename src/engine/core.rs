// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of commands describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) reads events from channels,
//! starts invocations and talks to the reload channel. The core is unit
//! tested without any Tokio, channels, filesystem, or processes.

use std::collections::HashMap;

use crate::engine::event_handlers::{
    handle_reload_request, handle_shutdown, handle_task_completion, handle_task_trigger,
    CoreState, CoreStep,
};
use crate::engine::queue::TriggerQueue;
use crate::engine::RuntimeEvent;
use crate::types::TriggerWhileRunningBehaviour;

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    state: CoreState,
}

impl CoreRuntime {
    pub fn new(behaviour: TriggerWhileRunningBehaviour) -> Self {
        Self {
            state: CoreState {
                running: HashMap::new(),
                queue: TriggerQueue::new(behaviour),
                shutting_down: false,
            },
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state.running.is_empty()
    }

    pub fn is_running(&self, task: &str) -> bool {
        self.state.running.contains_key(task)
    }

    pub fn queue_is_empty(&self) -> bool {
        self.state.queue.is_empty()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state.shutting_down
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskTriggered {
                task,
                reload,
                reason,
            } => handle_task_trigger(&mut self.state, task, reload, reason),
            RuntimeEvent::ReloadRequested { kind } => handle_reload_request(&mut self.state, kind),
            RuntimeEvent::TaskCompleted { task, outcome } => {
                handle_task_completion(&mut self.state, task, outcome)
            }
            RuntimeEvent::ShutdownRequested => handle_shutdown(&mut self.state),
        }
    }
}
