//! MJPEG over HTTP: `multipart/x-mixed-replace` framing.
//!
//! Every part on the wire looks like
//!
//! ```text
//! --frame\r\n
//! Content-Type: image/jpeg\r\n\r\n
//! <jpeg bytes>\r\n
//! ```
//!
//! [`encode_part`] and [`stream_response`] produce that framing for the HTTP
//! handlers. `MultipartParser` (tests and the `test-util` feature) splits it
//! back into JPEG payloads.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};

/// Response content type for an MJPEG stream.
pub const CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

const BOUNDARY: &[u8] = b"--frame\r\n";
const PART_HEADER: &[u8] = b"Content-Type: image/jpeg\r\n\r\n";
const PART_END: &[u8] = b"\r\n";

/// Frame one JPEG image as a multipart body chunk.
pub fn encode_part(jpeg: &[u8]) -> Bytes {
    let mut part =
        BytesMut::with_capacity(BOUNDARY.len() + PART_HEADER.len() + jpeg.len() + PART_END.len());
    part.extend_from_slice(BOUNDARY);
    part.extend_from_slice(PART_HEADER);
    part.extend_from_slice(jpeg);
    part.extend_from_slice(PART_END);
    part.freeze()
}

/// Wrap a stream of already-framed parts into a streaming `200` response.
///
/// The body ends when `parts` ends; dropping the response (client gone)
/// drops `parts` with it.
pub fn stream_response<S>(parts: S) -> Response
where
    S: Stream<Item = Bytes> + Send + 'static,
{
    let body = Body::from_stream(parts.map(Ok::<_, Infallible>));
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    response
}

/// A single `image/jpeg` response, uncached.
pub fn jpeg_response(jpeg: Bytes) -> Response {
    (
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
        ],
        jpeg,
    )
        .into_response()
}

/// Splits an MJPEG body back into JPEG payloads. Only built for tests, here
/// and in crates enabling the `test-util` feature.
#[cfg(any(test, feature = "test-util"))]
pub use parser::MultipartParser;

#[cfg(any(test, feature = "test-util"))]
mod parser {
    use bytes::{Bytes, BytesMut};

    use super::{BOUNDARY, PART_END};

    const HEADER_END: &[u8] = b"\r\n\r\n";

    /// Parse state for the MJPEG multipart stream.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum ParseState {
        /// Looking for the boundary marker `--frame\r\n`.
        SeekingBoundary,
        /// Found boundary, now looking for end of headers `\r\n\r\n`.
        SeekingHeaderEnd,
        /// Collecting JPEG bytes until the next boundary.
        CollectingJpeg,
    }

    /// Incremental splitter for an MJPEG multipart body.
    ///
    /// Feed it body chunks as they arrive, split anywhere; it hands back each
    /// complete JPEG payload once the following boundary has been seen.
    #[derive(Debug)]
    pub struct MultipartParser {
        buffer: BytesMut,
        state: ParseState,
        /// Offset into `buffer` already scanned for the next boundary.
        scan_from: usize,
    }

    impl Default for MultipartParser {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MultipartParser {
        pub fn new() -> Self {
            Self {
                buffer: BytesMut::with_capacity(256 * 1024),
                state: ParseState::SeekingBoundary,
                scan_from: 0,
            }
        }

        /// Append a chunk and return every payload it completed.
        pub fn push(&mut self, chunk: &[u8]) -> Vec<Bytes> {
            self.buffer.extend_from_slice(chunk);
            let mut frames = Vec::new();

            loop {
                match self.state {
                    ParseState::SeekingBoundary => {
                        if let Some(pos) = find_subsequence(&self.buffer, BOUNDARY) {
                            let _ = self.buffer.split_to(pos + BOUNDARY.len());
                            self.state = ParseState::SeekingHeaderEnd;
                        } else {
                            // Keep a tail in case the boundary spans chunks
                            if self.buffer.len() > BOUNDARY.len() {
                                let _ = self.buffer.split_to(self.buffer.len() - BOUNDARY.len());
                            }
                            break;
                        }
                    }
                    ParseState::SeekingHeaderEnd => {
                        if let Some(pos) = find_subsequence(&self.buffer, HEADER_END) {
                            let _ = self.buffer.split_to(pos + HEADER_END.len());
                            self.scan_from = 0;
                            self.state = ParseState::CollectingJpeg;
                        } else {
                            break;
                        }
                    }
                    ParseState::CollectingJpeg => {
                        let Some(pos) = find_subsequence(&self.buffer[self.scan_from..], BOUNDARY)
                        else {
                            self.scan_from = self.buffer.len().saturating_sub(BOUNDARY.len());
                            break;
                        };
                        let jpeg_end = self.scan_from + pos;
                        let jpeg = self.buffer.split_to(jpeg_end).freeze();
                        let _ = self.buffer.split_to(BOUNDARY.len());
                        let jpeg = strip_part_end(jpeg);
                        if !jpeg.is_empty() {
                            frames.push(jpeg);
                        }
                        // Already past the boundary
                        self.state = ParseState::SeekingHeaderEnd;
                    }
                }
            }

            frames
        }

        /// Flush the final payload of a body that has ended. A stream that is cut
        /// mid-headers yields nothing.
        pub fn finish(mut self) -> Option<Bytes> {
            if self.state != ParseState::CollectingJpeg {
                return None;
            }
            let jpeg = strip_part_end(self.buffer.split().freeze());
            (!jpeg.is_empty()).then_some(jpeg)
        }
    }

    fn strip_part_end(mut jpeg: Bytes) -> Bytes {
        if jpeg.ends_with(PART_END) {
            jpeg.truncate(jpeg.len() - PART_END.len());
        }
        jpeg
    }

    /// Find the position of `needle` in `haystack`.
    fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack
            .windows(needle.len())
            .position(|window| window == needle)
    }
}
