//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes in precedence order
//! - Look up the first matching route for a request
//! - Dispatch to the route's handler, or fall through to the next stage
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in declaration order; first match wins
//! - No match is explicit (`None`), the pipeline decides the fallback

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::http::middleware::{Handler, Middleware, Next};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::routing::matcher::{
    AndMatcher, ExactPathMatcher, Matcher, MethodMatcher, PathPrefixMatcher,
};

/// A named route: a match condition and the handler it dispatches to.
pub struct Route {
    pub name: &'static str,
    matcher: Box<dyn Matcher>,
    handler: Arc<dyn Handler>,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("matcher", &self.matcher)
            .finish_non_exhaustive()
    }
}

/// Ordered route table.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route with an arbitrary matcher.
    pub fn route(
        mut self,
        name: &'static str,
        matcher: impl Matcher + 'static,
        handler: impl Handler + 'static,
    ) -> Self {
        self.routes.push(Route {
            name,
            matcher: Box::new(matcher),
            handler: Arc::new(handler),
        });
        self
    }

    /// `method` and exact `path`.
    pub fn exact(self, name: &'static str, method: &str, path: &str, handler: impl Handler + 'static) -> Self {
        let matcher = AndMatcher::new(vec![
            Box::new(MethodMatcher::new(method)),
            Box::new(ExactPathMatcher::new(path)),
        ]);
        self.route(name, matcher, handler)
    }

    /// `method` and path starting with `prefix`.
    pub fn prefix(self, name: &'static str, method: &str, prefix: &str, handler: impl Handler + 'static) -> Self {
        let matcher = AndMatcher::new(vec![
            Box::new(MethodMatcher::new(method)),
            Box::new(PathPrefixMatcher::new(prefix)),
        ]);
        self.route(name, matcher, handler)
    }

    /// Any method, path starting with `prefix`.
    pub fn any_prefix(self, name: &'static str, prefix: &str, handler: impl Handler + 'static) -> Self {
        self.route(name, PathPrefixMatcher::new(prefix), handler)
    }

    /// Find the first route matching the request.
    pub fn match_request(&self, req: &Request) -> Option<&Route> {
        self.routes.iter().find(|r| r.matcher.matches(req))
    }

}

impl Middleware for Router {
    fn name(&self) -> &'static str {
        "routing"
    }

    fn handle<'a>(&'a self, req: &'a Request, next: Next<'a>) -> BoxFuture<'a, Response> {
        match self.match_request(req) {
            Some(route) => {
                tracing::debug!(route = route.name, path = %req.path(), "Route matched");
                route.handler.handle(req)
            }
            None => {
                tracing::debug!(path = %req.path(), "No route matched");
                next.run(req)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::middleware::{NotFound, Pipeline};
    use crate::http::request::HTTP_1_1;
    use crate::http::response::Status;

    struct Tag(&'static str);

    impl Handler for Tag {
        fn handle<'a>(&'a self, _req: &'a Request) -> BoxFuture<'a, Response> {
            Box::pin(async move { Response::ok(self.0) })
        }
    }

    fn router() -> Router {
        Router::new()
            .exact("root", "GET", "/", Tag("root"))
            .prefix("echo", "GET", "/echo/", Tag("echo"))
            .any_prefix("files", "/files/", Tag("files"))
            .any_prefix("shadowed", "/files/x", Tag("shadowed"))
    }

    #[test]
    fn first_match_wins() {
        let router = router();
        assert_eq!(router.routes.len(), 4);

        let hit = |method: &str, path: &str| {
            router
                .match_request(&Request::new(method, path, HTTP_1_1))
                .map(|r| r.name)
        };
        assert_eq!(hit("GET", "/"), Some("root"));
        assert_eq!(hit("POST", "/"), None);
        assert_eq!(hit("GET", "/echo/hi"), Some("echo"));
        assert_eq!(hit("POST", "/echo/hi"), None);
        assert_eq!(hit("POST", "/files/x"), Some("files"));
        assert_eq!(hit("GET", "/nothing"), None);
    }

    #[tokio::test]
    async fn unmatched_requests_fall_through() {
        let pipeline = Pipeline::new(Arc::new(NotFound)).layer(router());

        let response = pipeline.handle(&Request::new("GET", "/echo/hi", HTTP_1_1)).await;
        assert_eq!(response.body(), b"echo");

        let response = pipeline.handle(&Request::new("GET", "/missing", HTTP_1_1)).await;
        assert_eq!(response.status(), Status::NotFound);
        assert!(response.body().is_empty());
    }
}
