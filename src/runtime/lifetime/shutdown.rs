use tokio::signal;
use tracing::{error, warn};

/// 等待 Ctrl+C（Unix 上也监听 SIGTERM）
pub async fn listen_for_shutdown() {
    #[cfg(unix)]
    {
        let mut terminate = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                wait_ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = wait_ctrl_c() => {}
            _ = terminate.recv() => {
                warn!("SIGTERM received, initiating graceful shutdown...");
            }
        }
    }

    #[cfg(not(unix))]
    wait_ctrl_c().await;
}

async fn wait_ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => warn!("Shutdown signal received, initiating graceful shutdown..."),
        Err(e) => {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
