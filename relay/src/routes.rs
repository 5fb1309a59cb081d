use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use camfeed_common::mjpeg::{jpeg_response, stream_response};
use camfeed_common::status::Status;
use camfeed_common::viewers::ViewerCount;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::cell::LatestFrame;
use crate::pages::{CAMERA_HTML, VIEWER_HTML};
use crate::stream::mjpeg_stream;
use crate::upload::{decode_data_url, UploadError, UploadFrame};

pub struct AppState {
    pub cell: LatestFrame,
    pub viewers: ViewerCount,
    /// Re-send the last frame after this long without an upload.
    pub resend_interval: Option<Duration>,
    pub max_upload_bytes: usize,
    pub ip: Ipv4Addr,
    pub port: u16,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/", get(camera_page))
        .route("/camera.html", get(camera_page))
        .route("/viewer.html", get(viewer_page))
        .route("/upload_frame", post(upload_frame))
        .route("/stream", get(stream))
        .route("/frame.jpg", get(latest_frame))
        .route("/status", get(status))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// POST /upload_frame
/// Body: { "frame": "data:image/jpeg;base64,..." }
async fn upload_frame(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UploadFrame>, JsonRejection>,
) -> Result<&'static str, UploadError> {
    let Json(upload) = payload?;
    let jpeg = decode_data_url(&upload.frame)?;
    let frame = state.cell.publish(jpeg);
    if !frame.looks_like_jpeg() {
        debug!(seq = frame.seq, "uploaded frame lacks a JPEG marker");
    }
    debug!(seq = frame.seq, bytes = frame.len(), "frame received");
    Ok("OK")
}

/// GET /stream — endless MJPEG stream of uploaded frames
async fn stream(State(state): State<Arc<AppState>>) -> Response {
    let viewer = state.viewers.join();
    let watcher = state.cell.subscribe(state.resend_interval);
    stream_response(mjpeg_stream(watcher, viewer))
}

/// GET /frame.jpg — the most recent upload
async fn latest_frame(State(state): State<Arc<AppState>>) -> Response {
    match state.cell.snapshot() {
        Some(frame) => jpeg_response(frame.jpeg),
        None => (StatusCode::SERVICE_UNAVAILABLE, "no frame received yet").into_response(),
    }
}

async fn camera_page() -> Html<&'static str> {
    Html(CAMERA_HTML)
}

async fn viewer_page() -> Html<&'static str> {
    Html(VIEWER_HTML)
}

/// GET /status
async fn status(State(state): State<Arc<AppState>>) -> Json<Status> {
    Json(Status {
        viewers: state.viewers.current(),
        frames: state.cell.frames_received(),
        last_frame_ms: state.cell.last_frame_ms(),
        ..Status::running("relay", state.ip, state.port)
    })
}
