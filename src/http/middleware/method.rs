//! Method allow-list.

use futures_util::future::BoxFuture;

use crate::http::middleware::{Middleware, Next};
use crate::http::request::Request;
use crate::http::response::{Response, Status};

/// Methods the server understands. Anything else gets 405.
pub const ALLOWED_METHODS: [&str; 2] = ["GET", "POST"];

#[derive(Debug, Clone, Copy, Default)]
pub struct MethodCheck;

impl Middleware for MethodCheck {
    fn name(&self) -> &'static str {
        "method"
    }

    fn handle<'a>(&'a self, req: &'a Request, next: Next<'a>) -> BoxFuture<'a, Response> {
        if !ALLOWED_METHODS.iter().any(|m| *m == req.method()) {
            tracing::debug!(method = %req.method(), "Method not allowed");
            return Box::pin(async { Response::new(Status::MethodNotAllowed) });
        }
        next.run(req)
    }
}
