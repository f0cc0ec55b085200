//! Route matching logic.
//!
//! # Responsibilities
//! - Match the request path exactly or by prefix (case-sensitive)
//! - Optionally constrain a route to one method
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Paths are compared raw, without URL decoding
//! - Method matching is exact; the method gate upstream already
//!   rejected anything unusual
//! - No regex to guarantee O(n) matching

use crate::http::request::Request;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &Request) -> bool;
}

/// Matches the request method.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    method: String,
}

impl MethodMatcher {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
        }
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, req: &Request) -> bool {
        req.method() == self.method
    }
}

/// Matches one exact request path.
#[derive(Debug, Clone)]
pub struct ExactPathMatcher {
    path: String,
}

impl ExactPathMatcher {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Matcher for ExactPathMatcher {
    fn matches(&self, req: &Request) -> bool {
        req.path() == self.path
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &Request) -> bool {
        req.path().starts_with(&self.prefix)
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, req: &Request) -> bool {
        // All matchers must pass (AND)
        self.matchers.iter().all(|m| m.matches(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::HTTP_1_1;

    #[test]
    fn test_method_matcher() {
        let matcher = MethodMatcher::new("GET");
        assert!(matcher.matches(&Request::new("GET", "/", HTTP_1_1)));
        assert!(!matcher.matches(&Request::new("POST", "/", HTTP_1_1)));
    }

    #[test]
    fn test_exact_path_matcher() {
        let matcher = ExactPathMatcher::new("/user-agent");
        assert!(matcher.matches(&Request::new("GET", "/user-agent", HTTP_1_1)));
        assert!(!matcher.matches(&Request::new("GET", "/user-agent/", HTTP_1_1)));
        assert!(!matcher.matches(&Request::new("GET", "/USER-AGENT", HTTP_1_1)));
    }

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/echo/");
        assert!(matcher.matches(&Request::new("GET", "/echo/abc", HTTP_1_1)));
        assert!(matcher.matches(&Request::new("GET", "/echo/", HTTP_1_1)));
        assert!(!matcher.matches(&Request::new("GET", "/echo", HTTP_1_1)));
    }

    #[test]
    fn test_and_matcher() {
        let matcher = AndMatcher::new(vec![
            Box::new(MethodMatcher::new("GET")),
            Box::new(PathPrefixMatcher::new("/echo/")),
        ]);
        assert!(matcher.matches(&Request::new("GET", "/echo/x", HTTP_1_1)));
        assert!(!matcher.matches(&Request::new("POST", "/echo/x", HTTP_1_1)));
        assert!(!matcher.matches(&Request::new("GET", "/files/x", HTTP_1_1)));
    }
}
