mod camera;
mod encoder;
mod pages;
mod routes;
mod source;
mod stream;
#[cfg(feature = "webcam")]
mod webcam;

use std::path::PathBuf;
use std::sync::Arc;

use camera::CameraHandle;
use camfeed_common::config::Config;
use camfeed_common::shutdown;
use camfeed_common::status::local_ipv4;
use camfeed_common::viewers::ViewerCount;
use routes::AppState;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config_path = std::env::args().nth(1).map(PathBuf::from);

    let config = match Config::from_args(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        backend = config.camera.backend,
        index = config.camera.index,
        width = config.camera.width,
        height = config.camera.height,
        fps = config.camera.fps,
        jpeg_quality = config.camera.jpeg_quality,
        "starting camfeed capture"
    );

    let camera_config = config.camera.clone();
    let jpeg_quality = config.camera.jpeg_quality;
    let opened = tokio::task::spawn_blocking(move || {
        CameraHandle::spawn(move || source::open(&camera_config), jpeg_quality)
    })
    .await;
    let camera = match opened {
        Ok(Ok(camera)) => camera,
        Ok(Err(e)) => {
            error!(error = %e, "failed to open camera");
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "spawn_blocking failed");
            std::process::exit(1);
        }
    };

    let ip = local_ipv4();
    let state = Arc::new(AppState {
        camera: camera.clone(),
        viewers: ViewerCount::new(),
        fps: config.camera.fps,
        ip,
        port: config.server.port,
    });
    let app = routes::router(state);

    let addr = config.bind_addr();
    info!(addr, "camfeed capture server starting");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap_or_else(|e| {
        eprintln!("Failed to bind to {addr}: {e}");
        std::process::exit(1);
    });

    let port = config.server.port;
    info!(
        %ip,
        camera_url = %format_args!("http://{ip}:{port}/camera.html"),
        viewer_url = %format_args!("http://{ip}:{port}/viewer.html"),
        "listening"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown::signal().await;
            // Streams end on their next request once the camera is stopped
            camera.stop();
        })
        .await;
    if let Err(e) = served {
        error!(error = %e, "server error");
        std::process::exit(1);
    }
    info!("camfeed capture server stopped");
}
