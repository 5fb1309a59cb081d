use bytes::Bytes;
use camfeed_common::mjpeg::encode_part;
use camfeed_common::viewers::ViewerGuard;
use futures_util::{stream, Stream};
use tracing::{debug, info};

use crate::cell::FrameWatcher;

/// Per-connection MJPEG body fed from the latest-frame cell. Emits nothing
/// until the first upload and ends when the cell closes.
pub fn mjpeg_stream(
    watcher: FrameWatcher,
    viewer: ViewerGuard,
) -> impl Stream<Item = Bytes> + Send + 'static {
    stream::unfold((watcher, viewer), |(mut watcher, viewer)| async move {
        let Some(frame) = watcher.next().await else {
            info!("relay stream ended");
            return None;
        };
        debug!(seq = frame.seq, bytes = frame.len(), "sending frame");
        Some((encode_part(&frame.jpeg), (watcher, viewer)))
    })
}
