//! Minimal HTTP/1.1 server core.
//!
//! Accepts TCP connections, parses requests off the wire, runs them through
//! a fixed middleware pipeline and serves a handful of endpoints: echo,
//! user-agent reflection and file upload/download under a root directory.

pub mod config;
pub mod handlers;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
