//! RPC server implementation.

use super::routes::create_router;
use super::state::RpcState;
use super::RateLimitConfig;
use crate::SequencerIngress;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Errors from the RPC server.
#[derive(Debug, Error)]
pub enum RpcServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
}

/// Configuration for the RPC server.
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    /// Address to listen on. Port 0 picks a free port.
    pub listen_addr: SocketAddr,
    /// Per-client submission limits.
    pub rate_limit: RateLimitConfig,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8645)),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Handle for controlling a running RPC server.
pub struct RpcServerHandle {
    task: JoinHandle<()>,
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl RpcServerHandle {
    /// Address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(mut self) -> Result<(), tokio::task::JoinError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.task.await
    }

    /// Abort the server.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Wait for the server to finish.
    pub async fn join(self) -> Result<(), tokio::task::JoinError> {
        self.task.await
    }
}

/// HTTP server exposing a [`SequencerIngress`].
pub struct RpcServer {
    config: RpcServerConfig,
    state: RpcState,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, ingress: SequencerIngress) -> Self {
        let state = RpcState::new(ingress, config.rate_limit.clone());
        Self { config, state }
    }

    /// Bind and start serving in a background task.
    pub async fn start(self) -> Result<RpcServerHandle, RpcServerError> {
        let listener = tokio::net::TcpListener::bind(self.config.listen_addr).await?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "RPC server listening");

        let router = create_router(self.state);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let result = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
            if let Err(e) = result {
                error!(error = ?e, "RPC server error");
            }
            info!("RPC server stopped");
        });

        Ok(RpcServerHandle {
            task,
            local_addr,
            shutdown: Some(shutdown_tx),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use execbook_book::{BookConfig, ExecutionBook};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn test_default_config() {
        let config = RpcServerConfig::default();
        assert_eq!(config.listen_addr.port(), 8645);
        assert!(config.listen_addr.ip().is_loopback());
    }

    #[tokio::test]
    async fn test_serves_health_and_shuts_down() {
        let ingress = SequencerIngress::new(Arc::new(ExecutionBook::new(BookConfig::default())));
        let config = RpcServerConfig {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            ..RpcServerConfig::default()
        };
        let handle = RpcServer::new(config, ingress).start().await.unwrap();
        assert_ne!(handle.local_addr().port(), 0);

        let mut stream = tokio::net::TcpStream::connect(handle.local_addr())
            .await
            .unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.contains("\"status\":\"ok\""));

        handle.shutdown().await.unwrap();
    }
}
