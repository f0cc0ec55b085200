//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (tracking, keep-alive request loop)
//!     → Hand off to the HTTP pipeline per request
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked for graceful shutdown
//! - One task per connection; nothing mutable is shared between them

pub mod connection;
pub mod listener;

pub use connection::{serve_connection, ConnectionId, ConnectionSettings, ConnectionTracker};
pub use listener::{Listener, ListenerError};
