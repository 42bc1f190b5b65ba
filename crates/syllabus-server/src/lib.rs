//! Syllabus Server: REST API over a `KnowledgeBase`

pub mod error;
pub mod handlers;
pub mod router;


use std::sync::Arc;

use syllabus_core::KnowledgeBase;
use tracing::info;

pub use error::{ApiError, ApiResult};
pub use router::create_router;

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct ServerState {
    pub kb: KnowledgeBase,
}

impl ServerState {
    pub fn new(kb: KnowledgeBase) -> Self {
        ServerState { kb }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 3334,
        }
    }
}

pub struct SyllabusServer {
    state: Arc<ServerState>,
    config: ServerConfig,
}

impl SyllabusServer {
    pub fn new(kb: KnowledgeBase, config: ServerConfig) -> Self {
        SyllabusServer {
            state: Arc::new(ServerState::new(kb)),
            config,
        }
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    pub fn router(&self) -> axum::Router {
        create_router(self.state())
    }

    /// Bind and serve until Ctrl-C.
    pub async fn start(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("Syllabus API listening on http://{}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
