// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling `[watch.*]` bindings into glob sets.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Turning settled batches of changes into task triggers and reloads.
//! - Optional content hashing so a binding only fires on real edits.
//!
//! It does not run tasks; it only emits [`crate::engine::RuntimeEvent`]s.

pub mod dag_filter;
pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use event_handler::{matched_bindings, triggers_for_bindings, triggers_for_paths, ChangeTriggers};
pub use hash::HashStore;
pub use patterns::{build_bindings, WatchBinding};
pub use watcher::{spawn_watcher, WatcherHandle};
