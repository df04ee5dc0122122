use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use diffhub_notify::NotificationFanout;

use crate::config::ServiceConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// diffhub HTTP server.
pub struct DiffhubServer {
    config: ServiceConfig,
}

impl DiffhubServer {
    pub fn new(config: ServiceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Serve until `shutdown` resolves, then drain the processor.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let state = AppState::from_config(&self.config);
        let (stop_tx, stop_rx) = watch::channel(false);
        let reaper = tokio::spawn(reap_idle_connections(
            Arc::clone(&state.fanout),
            self.config.notify.idle_timeout(),
            stop_rx,
        ));

        let listener = TcpListener::bind(self.config.server.bind_addr).await?;
        info!(addr = %listener.local_addr()?, "diffhub server listening");

        let processor = Arc::clone(state.service.processor());
        let served = axum::serve(listener, build_router(state))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()));

        stop_tx.send_replace(true);
        processor.shutdown().await;
        if let Err(e) = reaper.await {
            tracing::warn!(error = %e, "idle reaper ended abnormally");
        }
        info!("diffhub server stopped");
        served
    }

    /// Serve until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        self.serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "cannot listen for shutdown signal");
            }
        })
        .await
    }
}

/// Periodically drop connections idle for longer than `max_idle`.
async fn reap_idle_connections(
    fanout: Arc<NotificationFanout>,
    max_idle: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let period = (max_idle / 2).max(Duration::from_secs(1));
    let mut ticker = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = stop.changed() => break,
            _ = ticker.tick() => {
                fanout.prune_idle(max_idle);
            }
        }
    }
}
