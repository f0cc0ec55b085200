//! Shared utilities for integration tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use http_server_core::config::ListenerConfig;
use http_server_core::http::ServerError;
use http_server_core::net::Listener;
use http_server_core::{HttpServer, ServerConfig, Shutdown};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tokio::task::JoinHandle;

/// A server running on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a server serving `directory` under `/files/`.
pub async fn start_server(directory: Option<PathBuf>) -> TestServer {
    let mut config = ServerConfig::default();
    config.files.directory = directory;
    config.timeouts.shutdown_grace_secs = 2;

    config.listener = ListenerConfig {
        bind_address: "127.0.0.1:0".into(),
        ..ListenerConfig::default()
    };

    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(HttpServer::new(config).run(listener, server_shutdown));

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

/// A response read straight off the socket.
#[derive(Debug)]
pub struct RawResponse {
    pub status_line: String,
    /// Lower-cased header names.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Read one `Content-Length` framed response.
pub async fn read_response<R>(reader: &mut R) -> RawResponse
where
    R: AsyncBufRead + Unpin,
{
    let mut status_line = String::new();
    reader.read_line(&mut status_line).await.unwrap();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':').expect("header line");
        headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    let length: usize = headers
        .get("content-length")
        .expect("content-length header")
        .parse()
        .unwrap();
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await.unwrap();

    RawResponse {
        status_line: status_line.trim_end().to_string(),
        headers,
        body,
    }
}

/// Wait for the server to close its side of the connection.
pub async fn expect_closed<R>(reader: &mut R)
where
    R: AsyncBufRead + Unpin,
{
    let mut rest = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(5), reader.read_to_end(&mut rest))
        .await
        .expect("connection should close")
        .unwrap();
    assert_eq!(read, 0, "unexpected trailing bytes: {:?}", String::from_utf8_lossy(&rest));
}
