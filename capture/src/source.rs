//! Capture backends.

use std::time::{Duration, Instant};

use camfeed_common::config::CameraConfig;
use image::{Rgb, RgbImage};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to open camera {0}: {1}")]
    Open(u32, String),
    #[error("failed to capture frame: {0}")]
    Read(String),
    #[error("unknown camera backend '{0}', expected 'webcam' or 'test-pattern'")]
    UnknownBackend(String),
    #[error("camera backend '{0}' is not compiled in, rebuild with `--features {0}` or set camera.backend = \"test-pattern\"")]
    NotCompiled(&'static str),
    #[error("failed to spawn camera thread: {0}")]
    Spawn(std::io::Error),
    #[error("camera is closed")]
    Closed,
}

/// Something that produces RGB images one at a time.
///
/// `read` may block until the next image is available. Sources are created
/// and used on a single thread, so they need not be `Send`.
pub trait FrameSource {
    fn read(&mut self) -> Result<RgbImage, CaptureError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// Open the backend selected by `camera.backend`.
pub fn open(config: &CameraConfig) -> Result<Box<dyn FrameSource>, CaptureError> {
    match config.backend.as_str() {
        "webcam" => open_webcam(config),
        "test-pattern" => Ok(Box::new(TestPattern::new(
            config.width,
            config.height,
            config.fps,
        ))),
        other => Err(CaptureError::UnknownBackend(other.to_string())),
    }
}

#[cfg(feature = "webcam")]
fn open_webcam(config: &CameraConfig) -> Result<Box<dyn FrameSource>, CaptureError> {
    let webcam = crate::webcam::Webcam::open(config.index, config.width, config.height, config.fps)?;
    Ok(Box::new(webcam))
}

#[cfg(not(feature = "webcam"))]
fn open_webcam(_config: &CameraConfig) -> Result<Box<dyn FrameSource>, CaptureError> {
    Err(CaptureError::NotCompiled("webcam"))
}

/// Synthetic moving image, paced to a fixed frame rate.
pub struct TestPattern {
    width: u32,
    height: u32,
    interval: Duration,
    next_due: Instant,
    frame: u64,
}

impl TestPattern {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        info!(width, height, fps, "using synthetic test pattern");
        Self {
            width,
            height,
            interval: Duration::from_secs(1) / fps.max(1),
            next_due: Instant::now(),
            frame: 0,
        }
    }

    fn render(&self) -> RgbImage {
        let t = self.frame;
        let (w, h) = (self.width as u64, self.height as u64);
        // A block bouncing across a scrolling gradient
        let box_w = (w / 6).max(1);
        let box_h = (h / 6).max(1);
        let box_x = bounce(t * 7, w.saturating_sub(box_w));
        let box_y = bounce(t * 5, h.saturating_sub(box_h));

        RgbImage::from_fn(self.width, self.height, |x, y| {
            let (x, y) = (x as u64, y as u64);
            if (box_x..box_x + box_w).contains(&x) && (box_y..box_y + box_h).contains(&y) {
                Rgb([0xE9, 0x45, 0x60])
            } else {
                Rgb([
                    ((x + t * 4) % 256) as u8,
                    ((y + t * 2) % 256) as u8,
                    0x2E,
                ])
            }
        })
    }
}

impl FrameSource for TestPattern {
    fn read(&mut self) -> Result<RgbImage, CaptureError> {
        let now = Instant::now();
        if now < self.next_due {
            std::thread::sleep(self.next_due - now);
        }
        self.next_due = self.next_due.max(now) + self.interval;

        let image = self.render();
        self.frame += 1;
        Ok(image)
    }

    fn name(&self) -> &str {
        "test-pattern"
    }
}

/// Triangle wave over `0..=span`.
fn bounce(step: u64, span: u64) -> u64 {
    if span == 0 {
        return 0;
    }
    let period = span * 2;
    let phase = step % period;
    if phase <= span {
        phase
    } else {
        period - phase
    }
}
