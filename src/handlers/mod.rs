//! Endpoint handlers.
//!
//! # Routes
//! ```text
//! GET  /             → root.rs       200, empty body
//! GET  /user-agent   → user_agent.rs echo the User-Agent header
//! GET  /echo/<text>  → echo.rs       echo <text>
//! *    /files/<path> → files.rs      upload (POST) / download (GET)
//! ```
//!
//! Everything else falls through to the pipeline's 404 handler.

pub mod echo;
pub mod files;
pub mod root;
pub mod user_agent;

use std::path::PathBuf;

use crate::routing::Router;

pub use echo::Echo;
pub use files::Files;
pub use root::Root;
pub use user_agent::UserAgent;

/// Build the route table in precedence order.
pub fn routes(files_root: Option<PathBuf>) -> Router {
    Router::new()
        .exact("root", "GET", "/", Root)
        .exact("user_agent", "GET", "/user-agent", UserAgent)
        .prefix("echo", "GET", echo::PREFIX, Echo)
        .any_prefix("files", files::PREFIX, Files::new(files_root))
}
