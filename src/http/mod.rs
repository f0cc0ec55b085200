//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → request.rs (parse one request off the wire)
//!     → middleware/ (version, method, compression, routing)
//!     → handlers (endpoint logic)
//!     → response.rs (serialize, framing headers)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use middleware::{Handler, Middleware, Pipeline};
pub use request::{read_request, ParseError, Request};
pub use response::{write_response, Response, Status};
pub use server::{HttpServer, ServerError};
