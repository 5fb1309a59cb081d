use bytes::Bytes;
use camfeed_common::mjpeg::encode_part;
use camfeed_common::viewers::ViewerGuard;
use futures_util::{stream, Stream};
use tracing::{info, warn};

use crate::camera::{CameraHandle, Shot};

/// Per-connection MJPEG body: one part per captured frame, ending at the
/// first failed read.
pub fn mjpeg_stream(
    camera: CameraHandle,
    viewer: ViewerGuard,
) -> impl Stream<Item = Bytes> + Send + 'static {
    stream::unfold((camera, viewer), |(camera, viewer)| async move {
        loop {
            match camera.capture().await {
                Shot::Frame(frame) => {
                    return Some((encode_part(&frame.jpeg), (camera, viewer)));
                }
                Shot::Skipped(e) => {
                    warn!(error = %e, "failed to encode frame, skipping");
                }
                Shot::Failed(e) => {
                    info!(reason = %e, "camera stream ended");
                    return None;
                }
            }
        }
    })
}
