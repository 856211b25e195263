//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Collect route registrations and fail fast on malformed ones
//! - Freeze routes into a table sorted by specificity
//! - Look up the matching route for a request and invoke its handler
//! - Return an explicit outcome: handled, no match, or handler failure
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in specificity order (acceptable for typical route counts)
//! - Stable sort: equal specificity resolves to the earliest registration
//! - Handler errors are logged here and never leave the router as errors

use axum::http::Method;

use crate::http::{Request, ResponseWriter};
use crate::routing::binder::{CallArgs, Handler, HandlerRef};
use crate::routing::matcher::{MatchContext, PathMatcher, PathSpec};
use crate::routing::route::Route;
use crate::routing::RegistrationError;

/// Result of a dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A route matched and its handler completed.
    Handled,
    /// No route accepted the method and path.
    NotFound,
    /// The matched handler failed or panicked.
    InternalError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Handled => "handled",
            Outcome::NotFound => "not_found",
            Outcome::InternalError => "internal_error",
        }
    }
}

/// Collects routes before the server starts.
#[derive(Debug, Default)]
pub struct RouterBuilder {
    routes: Vec<Route>,
    registered: usize,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a path spec and method.
    ///
    /// The matcher is compiled and the handler's shape checked immediately;
    /// on error nothing is added to the table.
    pub fn register<H, Args>(
        &mut self,
        spec: PathSpec,
        method: Method,
        handler: H,
    ) -> Result<&mut Self, RegistrationError>
    where
        H: Handler<Args>,
        Args: 'static,
    {
        let matcher = PathMatcher::compile(&spec)?;
        let handler = HandlerRef::bind(handler, matcher.yields_captures()).map_err(|source| {
            RegistrationError::InvalidHandlerShape {
                method: method.to_string(),
                spec: spec.source().to_string(),
                source,
            }
        })?;

        let route = Route::new(spec, matcher, method, handler, self.registered);
        tracing::debug!(
            method = %route.method(),
            path = %route.spec().source(),
            specificity = route.specificity(),
            "Route registered"
        );
        self.routes.push(route);
        self.registered += 1;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Freeze the table. Routes are ordered by descending specificity;
    /// the sort is stable so registration order breaks ties.
    pub fn build(self) -> Router {
        let mut routes = self.routes;
        routes.sort_by(|a, b| b.specificity().cmp(&a.specificity()));

        tracing::info!(routes = routes.len(), "Router built");
        Router { routes }
    }
}

/// The immutable route table.
#[derive(Debug)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Routes in match order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Find the first route accepting the method and path.
    pub fn find(&self, method: &Method, path: &str) -> Option<(&Route, MatchContext)> {
        self.routes
            .iter()
            .find_map(|route| route.accepts(method, path).map(|ctx| (route, ctx)))
    }

    /// Match the request and invoke the handler.
    pub async fn dispatch(&self, request: Request, response: ResponseWriter) -> Outcome {
        let (route, match_context) = match self.find(request.method(), request.path()) {
            Some(found) => found,
            None => {
                tracing::debug!(
                    method = %request.method(),
                    path = %request.path(),
                    "No route matched"
                );
                return Outcome::NotFound;
            }
        };

        let args = CallArgs {
            request: request.clone(),
            response,
            match_context,
        };

        match route.handler().invoke(args).await {
            Ok(()) => Outcome::Handled,
            Err(e) => {
                tracing::error!(
                    request_id = request.request_id().unwrap_or("unknown"),
                    method = %request.method(),
                    path = %request.path(),
                    route = %route.spec().source(),
                    error = %e,
                    "Handler invocation failure"
                );
                Outcome::InternalError
            }
        }
    }
}
