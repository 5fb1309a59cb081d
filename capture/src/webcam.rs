//! Webcam capture using nokhwa.

use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;
use tracing::{debug, info, warn};

use crate::source::{CaptureError, FrameSource};

pub struct Webcam {
    camera: Camera,
    index: u32,
    frame_count: u64,
}

impl Webcam {
    /// Open device `index` and start streaming, asking for the closest mode
    /// to the requested size and rate.
    pub fn open(index: u32, width: u32, height: u32, fps: u32) -> Result<Self, CaptureError> {
        info!(index, width, height, fps, "opening webcam");

        let wanted = CameraFormat::new(Resolution::new(width, height), FrameFormat::MJPEG, fps);
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(wanted));

        let mut camera = Camera::new(CameraIndex::Index(index), requested)
            .map_err(|e| CaptureError::Open(index, e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| CaptureError::Open(index, e.to_string()))?;

        let resolution = camera.resolution();
        info!(
            index,
            width = resolution.width(),
            height = resolution.height(),
            fps = camera.frame_rate(),
            "webcam opened"
        );

        Ok(Self {
            camera,
            index,
            frame_count: 0,
        })
    }
}

impl FrameSource for Webcam {
    fn read(&mut self) -> Result<RgbImage, CaptureError> {
        let frame = self
            .camera
            .frame()
            .map_err(|e| CaptureError::Read(e.to_string()))?;
        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::Read(e.to_string()))?;

        self.frame_count += 1;
        debug!(index = self.index, frame_count = self.frame_count, "captured frame");

        // nokhwa may link a different `image` release, so go through raw bytes
        let (width, height) = (decoded.width(), decoded.height());
        RgbImage::from_raw(width, height, decoded.into_raw())
            .ok_or_else(|| CaptureError::Read("frame buffer does not match its size".into()))
    }

    fn name(&self) -> &str {
        "webcam"
    }
}

impl Drop for Webcam {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            warn!(index = self.index, error = %e, "failed to stop webcam stream");
        }
        info!(index = self.index, frame_count = self.frame_count, "webcam closed");
    }
}
