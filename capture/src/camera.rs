//! Single-owner access to the capture device.
//!
//! One OS thread opens the source and keeps it for the life of the process.
//! HTTP streams ask that thread for frames over a channel, so reads and
//! encodes are serialized and never block a runtime worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use camfeed_common::frame::{Frame, FrameSequencer};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::encoder::{encode_jpeg, EncodeError};
use crate::source::{CaptureError, FrameSource};

/// Pending requests queued for the owner thread.
const REQUEST_QUEUE: usize = 16;

/// Outcome of one capture request.
#[derive(Debug)]
pub enum Shot {
    Frame(Frame),
    /// The image was read but could not be encoded.
    Skipped(EncodeError),
    /// The read failed, or the camera is shut down.
    Failed(CaptureError),
}

type Reply = oneshot::Sender<Shot>;

/// Cheap, cloneable handle to the camera owner thread.
#[derive(Clone)]
pub struct CameraHandle {
    requests: mpsc::Sender<Reply>,
    stopped: Arc<AtomicBool>,
    sequencer: Arc<FrameSequencer>,
}

impl CameraHandle {
    /// Spawn the owner thread and open the source on it. Returns once the
    /// source is open, or with the open error.
    pub fn spawn<F>(open: F, jpeg_quality: u8) -> Result<Self, CaptureError>
    where
        F: FnOnce() -> Result<Box<dyn FrameSource>, CaptureError> + Send + 'static,
    {
        let (requests, rx) = mpsc::channel::<Reply>(REQUEST_QUEUE);
        let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel(1);
        let stopped = Arc::new(AtomicBool::new(false));
        let sequencer = Arc::new(FrameSequencer::new());

        let owner_stopped = Arc::clone(&stopped);
        let owner_sequencer = Arc::clone(&sequencer);
        std::thread::Builder::new()
            .name("camera-owner".into())
            .spawn(move || {
                let source = match open() {
                    Ok(source) => {
                        let _ = ready_tx.send(Ok(()));
                        source
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                run_owner(source, rx, jpeg_quality, &owner_stopped, &owner_sequencer);
            })
            .map_err(CaptureError::Spawn)?;

        ready_rx.recv().map_err(|_| CaptureError::Closed)??;

        Ok(Self {
            requests,
            stopped,
            sequencer,
        })
    }

    /// Capture and encode one frame.
    pub async fn capture(&self) -> Shot {
        let (reply, rx) = oneshot::channel();
        if self.requests.send(reply).await.is_err() {
            return Shot::Failed(CaptureError::Closed);
        }
        rx.await.unwrap_or(Shot::Failed(CaptureError::Closed))
    }

    /// Make every later request fail, which ends open streams. The owner
    /// thread exits once the last handle is dropped.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::Relaxed) {
            info!("camera stopping");
        }
    }

    pub fn frames_captured(&self) -> u64 {
        self.sequencer.count()
    }

    pub fn last_frame_ms(&self) -> Option<i64> {
        self.sequencer.last_frame_ms()
    }
}

fn run_owner(
    mut source: Box<dyn FrameSource>,
    mut rx: mpsc::Receiver<Reply>,
    jpeg_quality: u8,
    stopped: &AtomicBool,
    sequencer: &FrameSequencer,
) {
    info!(source = source.name(), "camera owner thread running");

    while let Some(reply) = rx.blocking_recv() {
        if stopped.load(Ordering::Relaxed) {
            let _ = reply.send(Shot::Failed(CaptureError::Closed));
            continue;
        }
        // The stream that asked may already be gone
        if reply.is_closed() {
            continue;
        }

        let shot = match source.read() {
            Ok(image) => match encode_jpeg(&image, jpeg_quality) {
                Ok(jpeg) => {
                    let frame = sequencer.stamp(jpeg);
                    debug!(seq = frame.seq, bytes = frame.len(), "frame captured");
                    Shot::Frame(frame)
                }
                Err(e) => Shot::Skipped(e),
            },
            Err(e) => {
                warn!(error = %e, "camera read failed");
                Shot::Failed(e)
            }
        };
        let _ = reply.send(shot);
    }

    info!(frames = sequencer.count(), "camera owner thread exiting");
}
