//! A single registered route.

use axum::http::Method;

use crate::routing::binder::HandlerRef;
use crate::routing::matcher::{MatchContext, PathMatcher, PathSpec};

/// An immutable binding of a path matcher and method to a handler.
#[derive(Debug, Clone)]
pub struct Route {
    spec: PathSpec,
    matcher: PathMatcher,
    method: Method,
    handler: HandlerRef,
    specificity: u32,
    /// Registration sequence number, used to break specificity ties.
    index: usize,
}

impl Route {
    pub(crate) fn new(
        spec: PathSpec,
        matcher: PathMatcher,
        method: Method,
        handler: HandlerRef,
        index: usize,
    ) -> Self {
        let specificity = spec.specificity();
        Self {
            spec,
            matcher,
            method,
            handler,
            specificity,
            index,
        }
    }

    /// Test the route against a request. Method first, then path.
    pub fn accepts(&self, method: &Method, path: &str) -> Option<MatchContext> {
        if &self.method != method {
            return None;
        }
        self.matcher.matches(path)
    }

    pub fn spec(&self) -> &PathSpec {
        &self.spec
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    pub fn specificity(&self) -> u32 {
        self.specificity
    }

    pub fn index(&self) -> usize {
        self.index
    }
}
