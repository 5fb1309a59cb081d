mod cell;
mod pages;
mod routes;
mod stream;
mod upload;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use camfeed_common::config::Config;
use camfeed_common::shutdown;
use camfeed_common::status::local_ipv4;
use camfeed_common::viewers::ViewerCount;
use cell::LatestFrame;
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

    let resend_interval = match config.relay.resend_interval_ms {
        0 => None,
        ms => Some(Duration::from_millis(ms)),
    };

    info!(
        resend_interval_ms = config.relay.resend_interval_ms,
        max_upload_bytes = config.relay.max_upload_bytes,
        "starting camfeed relay"
    );

    let ip = local_ipv4();
    let state = Arc::new(AppState {
        cell: LatestFrame::new(),
        viewers: ViewerCount::new(),
        resend_interval,
        max_upload_bytes: config.relay.max_upload_bytes,
        ip,
        port: config.server.port,
    });
    let app = routes::router(Arc::clone(&state));

    let addr = config.bind_addr();
    info!(addr, "camfeed relay server starting");

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
            // Open streams finish once the cell is closed
            state.cell.close();
        })
        .await;
    if let Err(e) = served {
        error!(error = %e, "server error");
        std::process::exit(1);
    }
    info!("camfeed relay server stopped");
}
