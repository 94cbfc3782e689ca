// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] runs one-shot shell commands (compilers, package init,
//!   reload transport calls) with optional stdin.
//! - [`long_lived`] starts services and waits for them to become ready.
//! - [`backend`] provides the `ExecutorBackend` trait the watch runtime uses
//!   to start invocations, and the registry-backed production
//!   implementation.

pub mod backend;
pub mod command;
pub mod long_lived;

pub use backend::{ExecutorBackend, RegistryExecutor};
pub use command::{run_shell, shell_command, shell_quote, CommandOutput};
pub use long_lived::{parse_duration, spawn_service, Readiness, ServiceHandle};
