use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use assetflow::reload::ReloadNotifier;
use assetflow::types::ReloadKind;

/// Reload notifier that only remembers what it was asked to do.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    reloads: Arc<Mutex<Vec<ReloadKind>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reloads(&self) -> Vec<ReloadKind> {
        self.reloads.lock().unwrap().clone()
    }
}

impl ReloadNotifier for RecordingNotifier {
    fn notify(&self, kind: ReloadKind) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            self.reloads.lock().unwrap().push(kind);
        })
    }
}
