//! Protocol version gate.

use futures_util::future::BoxFuture;

use crate::http::middleware::{Middleware, Next};
use crate::http::request::{Request, HTTP_1_1};
use crate::http::response::{Response, Status};

/// Answers anything other than HTTP/1.1 with 426 and an `Upgrade` hint.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionCheck;

impl Middleware for VersionCheck {
    fn name(&self) -> &'static str {
        "version"
    }

    fn handle<'a>(&'a self, req: &'a Request, next: Next<'a>) -> BoxFuture<'a, Response> {
        if req.version() != HTTP_1_1 {
            tracing::debug!(version = %req.version(), "Unsupported HTTP version");
            return Box::pin(async {
                Response::new(Status::UpgradeRequired).with_header("Upgrade", HTTP_1_1)
            });
        }
        next.run(req)
    }
}
