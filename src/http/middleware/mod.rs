//! Middleware pipeline.
//!
//! # Data Flow
//! ```text
//! Request
//!     → version.rs     (426 unless HTTP/1.1)
//!     → method.rs      (405 unless GET/POST)
//!     → compression.rs (gzip the finished response on the way out)
//!     → routing        (dispatch to an endpoint, or fall through)
//!     → NotFound       (terminal 404)
//! ```
//!
//! # Design Decisions
//! - Stages are trait objects in an ordered list, outermost first
//! - A stage short-circuits by returning without calling `next.run`
//! - Stages hold no per-request state; the pipeline is shared via Arc

pub mod compression;
pub mod method;
pub mod version;

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::http::request::Request;
use crate::http::response::{Response, Status};

pub use compression::Compression;
pub use method::MethodCheck;
pub use version::VersionCheck;

/// Anything that turns a request into a response.
pub trait Handler: Send + Sync {
    fn handle<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Response>;
}

/// A stage that sees the request before the rest of the chain and the
/// response after it.
pub trait Middleware: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn handle<'a>(&'a self, req: &'a Request, next: Next<'a>) -> BoxFuture<'a, Response>;
}

/// The remainder of the chain below the current stage.
pub struct Next<'a> {
    stages: &'a [Arc<dyn Middleware>],
    endpoint: &'a dyn Handler,
}

impl<'a> Next<'a> {
    /// Run the remaining stages, ending at the terminal handler.
    pub fn run(self, req: &'a Request) -> BoxFuture<'a, Response> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                tracing::trace!(stage = stage.name(), "Entering middleware");
                stage.handle(
                    req,
                    Next {
                        stages: rest,
                        endpoint: self.endpoint,
                    },
                )
            }
            None => self.endpoint.handle(req),
        }
    }
}

/// An ordered list of middleware in front of a terminal handler.
pub struct Pipeline {
    stages: Vec<Arc<dyn Middleware>>,
    endpoint: Arc<dyn Handler>,
}

impl Pipeline {
    /// Start a pipeline that ends at `endpoint`.
    pub fn new(endpoint: Arc<dyn Handler>) -> Self {
        Self {
            stages: Vec::new(),
            endpoint,
        }
    }

    /// Append a stage. Stages run in the order they are added.
    pub fn layer(mut self, stage: impl Middleware + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

impl Handler for Pipeline {
    fn handle<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Response> {
        Next {
            stages: &self.stages,
            endpoint: self.endpoint.as_ref(),
        }
        .run(req)
    }
}

/// Terminal handler for requests nothing else claimed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFound;

impl Handler for NotFound {
    fn handle<'a>(&'a self, _req: &'a Request) -> BoxFuture<'a, Response> {
        Box::pin(async { Response::new(Status::NotFound) })
    }
}
