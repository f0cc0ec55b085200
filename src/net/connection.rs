//! Per-connection request loop and lifecycle tracking.
//!
//! # Responsibilities
//! - Run the keep-alive loop: read request → dispatch → write response
//! - Bound each wait for a request with the idle timeout
//! - Generate unique connection IDs for tracing
//! - Count open connections so shutdown can wait for them to drain
//!
//! # States
//! ```text
//! ReadingRequest → Dispatching → WritingResponse → ReadingRequest
//!                                                ↘ Closed
//! ```
//! Any read timeout, framing error, write error, `Connection: close` or
//! shutdown signal (between requests) moves the loop to Closed.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::broadcast;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::LimitsConfig;
use crate::http::middleware::Handler;
use crate::http::request::read_request;
use crate::http::response::write_response;
use crate::lifecycle::shutdown;
use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Tracks active connections for graceful shutdown.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new active connection. Returns a guard that decrements on drop.
    pub fn track(&self, peer: Option<SocketAddr>) -> ConnectionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        metrics::connection_opened();
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id: ConnectionId::new(),
            peer,
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Wait until all connections are closed or `grace` elapses.
    ///
    /// Returns `true` if every connection closed in time.
    pub async fn wait_for_shutdown(&self, grace: Duration) -> bool {
        let deadline = Instant::now() + grace;
        while self.active_count() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        true
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
    peer: Option<SocketAddr>,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        metrics::connection_closed();
        tracing::trace!(connection_id = %self.id, peer = ?self.peer, "Connection closed");
    }
}

/// Per-connection knobs taken from the server configuration.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    /// How long to wait for the next request before closing.
    pub idle_timeout: Duration,
    pub limits: LimitsConfig,
}

/// Serve requests on `stream` until the connection should close.
///
/// The stream is always shut down on return.
pub async fn serve_connection<S>(
    stream: S,
    handler: Arc<dyn Handler>,
    settings: ConnectionSettings,
    mut shutdown_rx: broadcast::Receiver<()>,
) where
    S: AsyncRead + AsyncWrite + Send,
{
    let (read_half, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);

    loop {
        // Shutdown only interrupts the wait for a new request. Once its first
        // bytes arrive the exchange runs to completion.
        let ready = tokio::select! {
            _ = shutdown::signalled(&mut shutdown_rx) => {
                tracing::debug!("Shutdown requested, closing connection");
                break;
            }
            ready = tokio::time::timeout(settings.idle_timeout, reader.fill_buf()) => ready,
        };

        match ready {
            Ok(Ok(buf)) if buf.is_empty() => {
                tracing::trace!("Client closed connection");
                break;
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Error reading from connection");
                break;
            }
            Err(_) => {
                tracing::debug!(timeout = ?settings.idle_timeout, "Idle timeout, closing connection");
                break;
            }
        }

        let parsed = tokio::time::timeout(
            settings.idle_timeout,
            read_request(&mut reader, &settings.limits),
        )
        .await;

        let request = match parsed {
            Ok(Ok(request)) => request,
            Ok(Err(e)) if e.is_clean_close() => {
                tracing::trace!("Client closed connection");
                break;
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Error parsing request");
                break;
            }
            Err(_) => {
                tracing::debug!(timeout = ?settings.idle_timeout, "Idle timeout, closing connection");
                break;
            }
        };

        let close = request.wants_close();
        let span = tracing::info_span!(
            "request",
            request_id = %Uuid::new_v4(),
            method = %request.method(),
            path = %request.path(),
        );
        let start = Instant::now();

        let mut response = handler.handle(&request).instrument(span.clone()).await;
        if close {
            response.set_header("Connection", "close");
        }
        let status = response.status();

        if let Err(e) = write_response(&mut writer, response).await {
            tracing::warn!(parent: &span, error = %e, "Error sending response");
            break;
        }

        metrics::record_request(request.method(), status.code(), start);
        tracing::info!(parent: &span, status = %status, "Request handled");

        if close {
            break;
        }
    }

    if let Err(e) = writer.shutdown().await {
        tracing::trace!(error = %e, "Error shutting down connection");
    }
}
