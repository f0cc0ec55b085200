//! Response compression.
//!
//! # Responsibilities
//! - Negotiate gzip from the request's `Accept-Encoding`
//! - Compress the finished response body in place
//! - Keep `Content-Length` in step with the compressed body
//!
//! # Design Decisions
//! - Runs after the downstream handler, so it always sees the final body
//! - Empty bodies are never compressed
//! - A codec failure falls back to the uncompressed response

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression as Level;
use futures_util::future::BoxFuture;

use crate::http::middleware::{Middleware, Next};
use crate::http::request::Request;
use crate::http::response::Response;

/// Gzip-compresses response bodies for clients that accept it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Compression;

impl Middleware for Compression {
    fn name(&self) -> &'static str {
        "compression"
    }

    fn handle<'a>(&'a self, req: &'a Request, next: Next<'a>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let mut response = next.run(req).await;

            let wants_gzip = req.header("accept-encoding").is_some_and(accepts_gzip);
            if !wants_gzip || response.body().is_empty() {
                return response;
            }

            match gzip(response.body()) {
                Ok(compressed) => {
                    tracing::trace!(
                        original = response.body().len(),
                        compressed = compressed.len(),
                        "Compressed response body"
                    );
                    response.set_header("Content-Encoding", "gzip");
                    response.set_header("Content-Length", compressed.len().to_string());
                    response.set_body(compressed);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Error compressing response body");
                }
            }
            response
        })
    }
}

/// True if any comma-separated coding in `accept_encoding` is gzip.
pub fn accepts_gzip(accept_encoding: &str) -> bool {
    accept_encoding
        .split(',')
        .any(|coding| coding.trim().eq_ignore_ascii_case("gzip"))
}

fn gzip(body: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 2), Level::default());
    encoder.write_all(body)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::middleware::{Handler, Pipeline};
    use crate::http::request::HTTP_1_1;
    use crate::http::response::Status;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use std::sync::Arc;

    struct Fixed(&'static str);

    impl Handler for Fixed {
        fn handle<'a>(&'a self, _req: &'a Request) -> BoxFuture<'a, Response> {
            Box::pin(async move { Response::ok(self.0) })
        }
    }

    fn pipeline(body: &'static str) -> Pipeline {
        Pipeline::new(Arc::new(Fixed(body))).layer(Compression)
    }

    fn gunzip(bytes: &[u8]) -> String {
        let mut out = String::new();
        GzDecoder::new(bytes).read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn accept_encoding_tokens() {
        assert!(accepts_gzip("gzip"));
        assert!(accepts_gzip("deflate, GZIP , br"));
        assert!(!accepts_gzip("deflate, br"));
        assert!(!accepts_gzip("gzip;q=0.5x"));
        assert!(!accepts_gzip(""));
    }

    #[tokio::test]
    async fn compresses_when_gzip_is_accepted() {
        let req = Request::new("GET", "/echo/abc", HTTP_1_1).with_header("Accept-Encoding", "invalid, gzip");
        let response = pipeline("abc").handle(&req).await;

        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.header("content-encoding"), Some("gzip"));
        assert_eq!(
            response.header("content-length"),
            Some(response.body().len().to_string().as_str())
        );
        assert_eq!(gunzip(response.body()), "abc");
    }

    #[tokio::test]
    async fn leaves_response_alone_without_gzip() {
        let req = Request::new("GET", "/", HTTP_1_1).with_header("Accept-Encoding", "br");
        let response = pipeline("abc").handle(&req).await;

        assert_eq!(response.header("content-encoding"), None);
        assert_eq!(response.body(), b"abc");

        let req = Request::new("GET", "/", HTTP_1_1);
        let response = pipeline("abc").handle(&req).await;
        assert_eq!(response.body(), b"abc");
    }

    #[tokio::test]
    async fn skips_empty_bodies() {
        let req = Request::new("GET", "/", HTTP_1_1).with_header("Accept-Encoding", "gzip");
        let response = pipeline("").handle(&req).await;

        assert_eq!(response.header("content-encoding"), None);
        assert!(response.body().is_empty());
    }
}
