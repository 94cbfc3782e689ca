// src/reload/mod.rs

//! Reload channel: tells connected clients to refresh after a rebuild.
//!
//! Every notification is broadcast in-process and, when configured, handed
//! to an external live-reload transport command. Transport failures are
//! logged and otherwise ignored; a missed reload never stops the watcher.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::ReloadSection;
use crate::exec::run_shell;
use crate::types::ReloadKind;

/// Receives reload requests from the watch runtime.
pub trait ReloadNotifier: Send {
    fn notify(&self, kind: ReloadKind) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

#[derive(Debug)]
pub struct ReloadChannel {
    tx: broadcast::Sender<ReloadKind>,
    full_cmd: Option<String>,
    inject_cmd: Option<String>,
    cwd: PathBuf,
}

impl ReloadChannel {
    pub fn new(section: &ReloadSection, cwd: impl Into<PathBuf>) -> Self {
        let (tx, _rx) = broadcast::channel(16);
        Self {
            tx,
            full_cmd: section.full_cmd.clone(),
            inject_cmd: section.inject_cmd.clone(),
            cwd: cwd.into(),
        }
    }

    /// Observe reload events in-process.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadKind> {
        self.tx.subscribe()
    }

    fn command_for(&self, kind: ReloadKind) -> Option<&str> {
        match kind {
            ReloadKind::None => None,
            ReloadKind::Full => self.full_cmd.as_deref(),
            // Without an injection command a full reload still shows the
            // new styles.
            ReloadKind::InjectStyles => self
                .inject_cmd
                .as_deref()
                .or(self.full_cmd.as_deref()),
        }
    }
}

impl ReloadNotifier for ReloadChannel {
    fn notify(&self, kind: ReloadKind) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            if kind == ReloadKind::None {
                return;
            }

            info!(reload = ?kind, "reloading clients");
            // No subscribers is fine.
            let _ = self.tx.send(kind);

            let Some(cmd) = self.command_for(kind).map(str::to_string) else {
                debug!(reload = ?kind, "no reload transport configured");
                return;
            };
            let cwd = self.cwd.clone();

            // The transport may be slow; don't hold up the event loop.
            tokio::spawn(async move {
                match run_shell(&cmd, &cwd, None).await {
                    Ok(out) if out.success => debug!(cmd = %cmd, "reload transport notified"),
                    Ok(out) => warn!(cmd = %cmd, reason = %out.failure_reason(), "reload transport failed"),
                    Err(e) => warn!(cmd = %cmd, error = %e, "could not run reload transport"),
                }
            });
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcasts_to_subscribers() {
        let channel = ReloadChannel::new(&ReloadSection::default(), std::env::temp_dir());
        let mut rx = channel.subscribe();

        channel.notify(ReloadKind::InjectStyles).await;
        channel.notify(ReloadKind::None).await;
        channel.notify(ReloadKind::Full).await;

        assert_eq!(rx.recv().await.unwrap(), ReloadKind::InjectStyles);
        assert_eq!(rx.recv().await.unwrap(), ReloadKind::Full);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn inject_falls_back_to_full_command() {
        let section = ReloadSection {
            full_cmd: Some("reload-all".into()),
            inject_cmd: None,
        };
        let channel = ReloadChannel::new(&section, ".");
        assert_eq!(channel.command_for(ReloadKind::InjectStyles), Some("reload-all"));
        assert_eq!(channel.command_for(ReloadKind::None), None);
    }
}
