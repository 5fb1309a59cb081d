use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::info;

/// Counts open MJPEG responses.
#[derive(Debug, Clone, Default)]
pub struct ViewerCount {
    active: Arc<AtomicUsize>,
}

impl ViewerCount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a viewer; the count drops again when the guard is dropped.
    pub fn join(&self) -> ViewerGuard {
        let viewers = self.active.fetch_add(1, Ordering::Relaxed) + 1;
        info!(viewers, "viewer joined");
        ViewerGuard {
            active: Arc::clone(&self.active),
        }
    }

    pub fn current(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }
}

/// Held by a stream for as long as its connection is open.
#[derive(Debug)]
pub struct ViewerGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for ViewerGuard {
    fn drop(&mut self) {
        let viewers = self.active.fetch_sub(1, Ordering::Relaxed) - 1;
        info!(viewers, "viewer left");
    }
}
