use futures_util::future::BoxFuture;

use crate::http::middleware::Handler;
use crate::http::request::Request;
use crate::http::response::Response;

pub const PREFIX: &str = "/echo/";

/// `GET /echo/<text>`: responds with `<text>` exactly as sent, undecoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Echo;

impl Handler for Echo {
    fn handle<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Response> {
        let content = req.path().strip_prefix(PREFIX).unwrap_or_default();
        Box::pin(async move { Response::ok(content) })
    }
}
