use bytes::Bytes;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// JPEG start-of-image marker.
const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// A single JPEG-encoded camera frame.
///
/// The image bytes are reference counted, so cloning a frame to hand it to
/// another stream is cheap and always yields the complete image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub jpeg: Bytes,
    /// Unix millis at which the frame was captured or received.
    pub captured_at_ms: i64,
    pub seq: u64,
}

impl Frame {
    pub fn new(jpeg: impl Into<Bytes>, captured_at_ms: i64, seq: u64) -> Self {
        Self {
            jpeg: jpeg.into(),
            captured_at_ms,
            seq,
        }
    }

    pub fn len(&self) -> usize {
        self.jpeg.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jpeg.is_empty()
    }

    /// Whether the payload starts with a JPEG SOI marker. Purely informational:
    /// nothing rejects frames on this.
    pub fn looks_like_jpeg(&self) -> bool {
        self.jpeg.starts_with(&JPEG_SOI)
    }
}

/// Stamps frames with a process-local sequence number and wall-clock time.
#[derive(Debug, Default)]
pub struct FrameSequencer {
    next: AtomicU64,
    last_ms: AtomicI64,
}

impl FrameSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stamp(&self, jpeg: impl Into<Bytes>) -> Frame {
        let now_ms = chrono::Utc::now().timestamp_millis();
        self.last_ms.store(now_ms, Ordering::Relaxed);
        let seq = self.next.fetch_add(1, Ordering::Relaxed);
        Frame::new(jpeg, now_ms, seq)
    }

    /// Number of frames stamped so far.
    pub fn count(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }

    /// Timestamp of the most recent frame, if any.
    pub fn last_frame_ms(&self) -> Option<i64> {
        match self.count() {
            0 => None,
            _ => Some(self.last_ms.load(Ordering::Relaxed)),
        }
    }
}
