use std::net::Ipv4Addr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use camfeed_common::mjpeg::{jpeg_response, stream_response};
use camfeed_common::status::Status;
use camfeed_common::viewers::ViewerCount;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::camera::{CameraHandle, Shot};
use crate::pages::{CAMERA_HTML, VIEWER_HTML};
use crate::stream::mjpeg_stream;

pub struct AppState {
    pub camera: CameraHandle,
    pub viewers: ViewerCount,
    pub fps: u32,
    pub ip: Ipv4Addr,
    pub port: u16,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/", get(camera_page))
        .route("/camera.html", get(camera_page))
        .route("/viewer.html", get(viewer_page))
        .route("/video_feed", get(video_feed))
        .route("/frame.jpg", get(single_frame))
        .route("/status", get(status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /video_feed — endless MJPEG stream straight from the camera
async fn video_feed(State(state): State<Arc<AppState>>) -> Response {
    let viewer = state.viewers.join();
    stream_response(mjpeg_stream(state.camera.clone(), viewer))
}

/// GET /frame.jpg — capture and return a single frame
async fn single_frame(State(state): State<Arc<AppState>>) -> Response {
    match state.camera.capture().await {
        Shot::Frame(frame) => jpeg_response(frame.jpeg),
        Shot::Skipped(e) => {
            warn!(error = %e, "failed to encode single frame");
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
        Shot::Failed(e) => {
            warn!(error = %e, "failed to capture single frame");
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
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
        fps: Some(state.fps),
        frames: state.camera.frames_captured(),
        last_frame_ms: state.camera.last_frame_ms(),
        ..Status::running("capture", state.ip, state.port)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::tests::{scripted_camera, Scripted};
    use crate::source::CaptureError;
    use axum::body::Body;
    use axum::http::{header, Request};
    use camfeed_common::mjpeg::MultipartParser;
    use http_body_util::BodyExt;
    use image::RgbImage;
    use tower::ServiceExt;

    fn state_with(source: Scripted) -> Arc<AppState> {
        Arc::new(AppState {
            camera: scripted_camera(source),
            viewers: ViewerCount::new(),
            fps: 30,
            ip: Ipv4Addr::LOCALHOST,
            port: 5000,
        })
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn collect_frames(response: Response) -> Vec<bytes::Bytes> {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let mut parser = MultipartParser::new();
        let mut frames = parser.push(&body);
        frames.extend(parser.finish());
        frames
    }

    #[tokio::test]
    async fn stream_emits_one_part_per_frame_then_closes() {
        let state = state_with(Scripted::frames(3));
        let response = router(Arc::clone(&state))
            .oneshot(get_request("/video_feed"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "multipart/x-mixed-replace; boundary=frame"
        );

        let frames = collect_frames(response).await;
        assert_eq!(frames.len(), 3);
        for frame in &frames {
            assert_eq!(&frame[..2], &[0xFF, 0xD8]);
        }
        assert_eq!(state.viewers.current(), 0);
    }

    #[tokio::test]
    async fn stream_skips_unencodable_frames() {
        let state = state_with(Scripted::with(vec![
            Ok(RgbImage::new(4, 4)),
            Ok(RgbImage::new(0, 4)),
            Ok(RgbImage::new(4, 4)),
            Err(CaptureError::Read("unplugged".into())),
            Ok(RgbImage::new(4, 4)),
        ]));
        let response = router(state).oneshot(get_request("/video_feed")).await.unwrap();
        assert_eq!(collect_frames(response).await.len(), 2);
    }

    #[tokio::test]
    async fn stream_with_failing_camera_is_empty() {
        let state = state_with(Scripted::frames(0));
        let response = router(state).oneshot(get_request("/video_feed")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(collect_frames(response).await.is_empty());
    }

    #[tokio::test]
    async fn pages_embed_the_feed() {
        for uri in ["/camera.html", "/viewer.html", "/"] {
            let response = router(state_with(Scripted::frames(0)))
                .oneshot(get_request(uri))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
            assert!(content_type.to_str().unwrap().starts_with("text/html"));
            let body = response.into_body().collect().await.unwrap().to_bytes();
            let html = std::str::from_utf8(&body).unwrap();
            assert!(html.contains(r#"<img src="/video_feed""#), "{uri}");
        }
    }

    #[tokio::test]
    async fn single_frame_endpoint() {
        let state = state_with(Scripted::frames(1));
        let app = router(state);

        let response = app.clone().oneshot(get_request("/frame.jpg")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "image/jpeg");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..2], &[0xFF, 0xD8]);

        let response = app.oneshot(get_request("/frame.jpg")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn status_counts_open_streams() {
        let state = state_with(Scripted::frames(100));
        let app = router(Arc::clone(&state));

        let stream = app.clone().oneshot(get_request("/video_feed")).await.unwrap();

        let response = app.clone().oneshot(get_request("/status")).await.unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["service"], "capture");
        assert_eq!(json["clients"], 1);
        assert_eq!(json["fps"], 30);
        assert_eq!(json["ip"], "127.0.0.1");
        assert_eq!(json["port"], 5000);

        drop(stream);
        assert_eq!(state.viewers.current(), 0);
    }

    #[tokio::test]
    async fn cors_allows_any_origin_for_reads_only() {
        let app = router(state_with(Scripted::frames(0)));

        let preflight = |method: &str| {
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/status")
                .header(header::ORIGIN, "http://viewer.local")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, method)
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(preflight("GET")).await.unwrap();
        let headers = response.headers();
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(), "GET");
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap(), "*");

        let response = app.oneshot(preflight("POST")).await.unwrap();
        let allowed = response.headers().get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap();
        assert!(!allowed.to_str().unwrap().contains("POST"));
    }
}
