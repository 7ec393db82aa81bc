use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;
use log::{info, warn};
use tokio::net::TcpListener;

/// inkpost HTTP server.
pub struct InkpostServer {
    config: ServerConfig,
    state: AppState,
}

impl InkpostServer {
    /// Validates `config` and opens the store it names.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        let state = AppState::from_config(&config)?;
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Serve until the process receives Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!(
            "event=server_start module=server status=ok bind_addr={} database={}",
            self.config.bind_addr,
            self.config.database_path.display()
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        info!("event=server_stop module=server status=ok");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            "event=server_stop module=server status=error error={}",
            err
        );
    }
}
