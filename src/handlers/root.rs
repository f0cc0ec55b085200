use futures_util::future::BoxFuture;

use crate::http::middleware::Handler;
use crate::http::request::Request;
use crate::http::response::{Response, Status};

/// `GET /`: an empty 200.
#[derive(Debug, Clone, Copy, Default)]
pub struct Root;

impl Handler for Root {
    fn handle<'a>(&'a self, _req: &'a Request) -> BoxFuture<'a, Response> {
        Box::pin(async { Response::new(Status::Ok) })
    }
}
