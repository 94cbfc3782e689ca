// src/exec/command.rs

//! One-shot shell commands: compiler invocations, package init, reload
//! transport calls.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    /// Exit code, or `None` if the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl CommandOutput {
    /// A short, human-readable failure reason: trimmed stderr, or the exit
    /// code when the command printed nothing.
    pub fn failure_reason(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        match self.code {
            Some(code) => format!("exited with code {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Build a shell command appropriate for the platform.
pub fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

/// Quote `arg` so the platform shell passes it through as one literal
/// word.
pub fn shell_quote(arg: &str) -> String {
    if cfg!(windows) {
        format!("\"{}\"", arg.replace('"', "\"\""))
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

/// Run `cmd` through the shell in `cwd`, feeding `stdin` if given, and
/// collect its output.
///
/// A non-zero exit is not an error here; callers decide what it means via
/// [`CommandOutput::success`]. Errors are reserved for failing to spawn or
/// wait on the process.
pub async fn run_shell(cmd: &str, cwd: &Path, stdin: Option<Vec<u8>>) -> Result<CommandOutput> {
    debug!(cmd = %cmd, cwd = ?cwd, "running command");

    let mut command = shell_command(cmd);
    command
        .current_dir(cwd)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning command '{cmd}'"))?;

    // Feed stdin from a separate task so a command that writes a lot before
    // reading all of its input cannot deadlock against us.
    let writer = match (stdin, child.stdin.take()) {
        (Some(bytes), Some(mut pipe)) => Some(tokio::spawn(async move {
            let res = pipe.write_all(&bytes).await;
            drop(pipe);
            res
        })),
        _ => None,
    };

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for command '{cmd}'"))?;

    if let Some(writer) = writer {
        match writer.await {
            Ok(Err(e)) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                warn!(cmd = %cmd, error = %e, "failed to write command stdin");
            }
            _ => {}
        }
    }

    let result = CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: output.stdout,
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    debug!(
        cmd = %cmd,
        exit_code = ?result.code,
        success = result.success,
        "command exited"
    );

    Ok(result)
}
