use tracing::{error, info};

/// Resolves on Ctrl-C, or on SIGTERM where the platform has it.
pub async fn signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!(signal = "ctrl-c", "shutting down"),
        _ = terminate => info!(signal = "terminate", "shutting down"),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::signal::unix::SignalKind;

    fn send_sigterm_to_self() {
        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn resolves_on_sigterm() {
        // Keeps SIGTERM routed to tokio for the whole test binary
        let _registered = tokio::signal::unix::signal(SignalKind::terminate()).unwrap();

        let mut waiting = tokio::spawn(signal());
        // The handler inside `signal` is only live once the task has been
        // polled, so keep signalling until it notices.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            send_sigterm_to_self();
            match tokio::time::timeout(Duration::from_millis(50), &mut waiting).await {
                Ok(joined) => break joined.unwrap(),
                Err(_) => assert!(tokio::time::Instant::now() < deadline, "SIGTERM ignored"),
            }
        }
    }
}
