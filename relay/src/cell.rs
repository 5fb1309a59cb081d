//! The latest-frame cell shared by the upload handler and every viewer.
//!
//! Backed by a `tokio::sync::watch` channel: an upload swaps in a whole new
//! [`Frame`] and wakes the watchers, a reader clones the current one. A reader
//! therefore always sees one complete upload, never a mix of two.

use std::time::Duration;

use bytes::Bytes;
use camfeed_common::frame::{Frame, FrameSequencer};
use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Clone, Default)]
struct Slot {
    frame: Option<Frame>,
    /// Set at shutdown; watchers stop once they see it.
    closed: bool,
}

pub struct LatestFrame {
    tx: watch::Sender<Slot>,
    sequencer: FrameSequencer,
}

impl Default for LatestFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl LatestFrame {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Slot::default());
        Self {
            tx,
            sequencer: FrameSequencer::new(),
        }
    }

    /// Replace the current frame and wake every watcher.
    pub fn publish(&self, jpeg: Bytes) -> Frame {
        let frame = self.sequencer.stamp(jpeg);
        let stored = frame.clone();
        self.tx.send_modify(|slot| slot.frame = Some(stored));
        frame
    }

    pub fn snapshot(&self) -> Option<Frame> {
        self.tx.borrow().frame.clone()
    }

    /// Watch for frames. With `resend` set, the current frame is handed out
    /// again whenever that long passes without a new upload.
    pub fn subscribe(&self, resend: Option<Duration>) -> FrameWatcher {
        FrameWatcher {
            rx: self.tx.subscribe(),
            resend,
            fresh: true,
        }
    }

    /// End all current and future watchers.
    pub fn close(&self) {
        info!("closing latest-frame cell");
        self.tx.send_modify(|slot| slot.closed = true);
    }

    pub fn frames_received(&self) -> u64 {
        self.sequencer.count()
    }

    pub fn last_frame_ms(&self) -> Option<i64> {
        self.sequencer.last_frame_ms()
    }
}

pub struct FrameWatcher {
    rx: watch::Receiver<Slot>,
    resend: Option<Duration>,
    /// The slot may hold a frame this watcher has not handed out yet.
    fresh: bool,
}

/// Marker for a closed cell.
struct Closed;

impl FrameWatcher {
    /// Wait for the next frame to send. Returns the current frame right away
    /// on the first call if there is one; before the first upload it waits.
    /// `None` once the cell is closed.
    pub async fn next(&mut self) -> Option<Frame> {
        loop {
            if self.fresh {
                self.fresh = false;
                match self.current() {
                    Err(Closed) => return None,
                    Ok(Some(frame)) => return Some(frame),
                    Ok(None) => {}
                }
            }

            let changed = match self.resend {
                Some(interval) => match tokio::time::timeout(interval, self.rx.changed()).await {
                    Ok(changed) => changed,
                    Err(_) => match self.current() {
                        Err(Closed) => return None,
                        Ok(Some(stale)) => return Some(stale),
                        Ok(None) => continue,
                    },
                },
                None => self.rx.changed().await,
            };
            if changed.is_err() {
                return None;
            }
            self.fresh = true;
        }
    }

    fn current(&mut self) -> Result<Option<Frame>, Closed> {
        let slot = self.rx.borrow_and_update();
        if slot.closed {
            return Err(Closed);
        }
        Ok(slot.frame.clone())
    }
}
