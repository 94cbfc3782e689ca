// src/exec/long_lived.rs

//! Long-lived processes (dev servers, live-reload servers).
//!
//! A service is considered started once it is *ready*: a stdout line
//! matched `ready_on_stdout`, `ready_after` elapsed, or immediately when
//! neither is configured. The process keeps running after that until its
//! [`ServiceHandle`] is dropped.

use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::{debug, info};

use super::command::shell_command;

/// How to decide that a freshly spawned service is up.
#[derive(Debug, Clone, Default)]
pub struct Readiness {
    pub stdout_pattern: Option<Regex>,
    pub after: Option<Duration>,
}

/// A running service. Dropping the handle kills the process.
pub struct ServiceHandle {
    name: String,
    child: Child,
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("name", &self.name)
            .field("pid", &self.child.id())
            .finish()
    }
}

impl ServiceHandle {
    /// Whether the process is still alive.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

/// Spawn `cmd` as a long-lived service and wait until it is ready.
///
/// Fails if the process cannot be spawned or exits before becoming ready.
pub async fn spawn_service(
    name: &str,
    cmd: &str,
    cwd: &Path,
    readiness: Readiness,
) -> Result<ServiceHandle> {
    info!(task = %name, cmd = %cmd, "starting service");

    let mut command = shell_command(cmd);
    command
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning service for task '{name}'"))?;

    let (ready_tx, ready_rx) = oneshot::channel::<()>();
    let ready_rx = readiness.stdout_pattern.is_some().then_some(ready_rx);

    if let Some(stdout) = child.stdout.take() {
        spawn_stdout_monitor(name.to_string(), stdout, readiness.stdout_pattern.clone(), ready_tx);
    }

    // Always consume stderr so buffers don't fill; log at debug.
    if let Some(stderr) = child.stderr.take() {
        let task_name = name.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(task = %task_name, "stderr: {}", line);
            }
        });
    }

    if ready_rx.is_none() && readiness.after.is_none() {
        return Ok(ServiceHandle {
            name: name.to_string(),
            child,
        });
    }

    let stdout_ready = async {
        match ready_rx {
            // A closed channel means stdout ended without a match; leave the
            // decision to the exit / timer branches.
            Some(rx) => {
                if rx.await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
            None => std::future::pending::<()>().await,
        }
    };

    let timer = async {
        match readiness.after {
            Some(dur) => sleep(dur).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        status = child.wait() => {
            let status = status.with_context(|| format!("waiting for service '{name}'"))?;
            bail!("service '{name}' exited before becoming ready ({status})");
        }
        _ = stdout_ready => {
            info!(task = %name, "service ready (stdout matched)");
        }
        _ = timer => {
            info!(task = %name, "service ready (ready_after elapsed)");
        }
    }

    Ok(ServiceHandle {
        name: name.to_string(),
        child,
    })
}

fn spawn_stdout_monitor(
    task_name: String,
    stdout: tokio::process::ChildStdout,
    pattern: Option<Regex>,
    ready_tx: oneshot::Sender<()>,
) {
    tokio::spawn(async move {
        let mut ready_tx = Some(ready_tx);
        let mut lines = BufReader::new(stdout).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            debug!(task = %task_name, "stdout: {}", line);

            if let Some(re) = &pattern {
                if re.is_match(&line) {
                    if let Some(tx) = ready_tx.take() {
                        let _ = tx.send(());
                    }
                }
            }
        }

        debug!(task = %task_name, "stdout monitor ended");
    });
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;

    let secs_per_unit = match unit_part.trim().to_lowercase().as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        unit => {
            return Err(format!(
                "unsupported duration unit '{unit}'; expected ms, s, m, or h"
            ))
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
