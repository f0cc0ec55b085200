use futures_util::future::BoxFuture;

use crate::http::middleware::Handler;
use crate::http::request::Request;
use crate::http::response::Response;

/// `GET /user-agent`: reflects the `User-Agent` request header.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserAgent;

impl Handler for UserAgent {
    fn handle<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Response> {
        let agent = req.header("user-agent").unwrap_or_default();
        Box::pin(async move { Response::ok(agent) })
    }
}
