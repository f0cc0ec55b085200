//! HTTP server setup and accept loop.
//!
//! # Responsibilities
//! - Assemble the middleware pipeline in its fixed order
//! - Accept connections and spawn one task per connection
//! - Stop accepting on shutdown and wait for connections to drain

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing::Instrument;

use crate::config::ServerConfig;
use crate::handlers;
use crate::http::middleware::{Compression, Handler, MethodCheck, NotFound, Pipeline, VersionCheck};
use crate::lifecycle::shutdown;
use crate::net::listener::ConnectionPermit;
use crate::net::{serve_connection, ConnectionSettings, ConnectionTracker, Listener, ListenerError};

/// Error type for running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP/1.1 server: a listener plus the shared request pipeline.
pub struct HttpServer {
    config: Arc<ServerConfig>,
    pipeline: Arc<Pipeline>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        let pipeline = Arc::new(Self::pipeline(&config));
        tracing::debug!(stages = ?pipeline.stage_names(), "Pipeline assembled");
        Self {
            config: Arc::new(config),
            pipeline,
        }
    }

    /// Build the request pipeline.
    ///
    /// Order matters: the version and method gates short-circuit before
    /// anything else runs, and compression sits above routing so it sees the
    /// finished body on the way back out.
    pub fn pipeline(config: &ServerConfig) -> Pipeline {
        Pipeline::new(Arc::new(NotFound))
            .layer(VersionCheck)
            .layer(MethodCheck)
            .layer(Compression)
            .layer(handlers::routes(config.files.directory.clone()))
    }

    /// Run the server, accepting connections on `listener` until
    /// `shutdown_rx` fires.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_connections = listener.max_connections(),
            directory = ?self.config.files.directory,
            "HTTP server starting"
        );

        let settings = ConnectionSettings {
            idle_timeout: self.config.timeouts.idle_read(),
            limits: self.config.limits,
        };
        let tracker = ConnectionTracker::new();

        loop {
            let accepted = tokio::select! {
                _ = shutdown::signalled(&mut shutdown_rx) => break,
                accepted = listener.accept() => accepted,
            };

            let (stream, peer, permit) = match accepted {
                Ok(conn) => conn,
                Err(ListenerError::Accept(e)) => {
                    tracing::error!(error = %e, "Error accepting connection");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            self.spawn_connection(stream, peer, permit, &tracker, settings, shutdown_rx.resubscribe());
        }

        tracing::info!(
            active_connections = tracker.active_count(),
            "HTTP server stopping, draining connections"
        );
        if !tracker.wait_for_shutdown(self.config.timeouts.shutdown_grace()).await {
            tracing::warn!(
                active_connections = tracker.active_count(),
                "Grace period elapsed with connections still open"
            );
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    fn spawn_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        permit: ConnectionPermit,
        tracker: &ConnectionTracker,
        settings: ConnectionSettings,
        shutdown_rx: broadcast::Receiver<()>,
    ) {
        let guard = tracker.track(Some(peer));
        let span = tracing::info_span!("connection", connection_id = %guard.id(), peer = %peer);
        let handler: Arc<dyn Handler> = self.pipeline.clone();

        tokio::spawn(
            async move {
                tracing::debug!("Accepted connection");
                serve_connection(stream, handler, settings, shutdown_rx).await;
                drop(permit);
                drop(guard);
            }
            .instrument(span),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_order_is_fixed() {
        let pipeline = HttpServer::pipeline(&ServerConfig::default());
        assert_eq!(
            pipeline.stage_names(),
            vec!["version", "method", "compression", "routing"]
        );
    }
}
