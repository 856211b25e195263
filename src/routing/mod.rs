//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Registration (at startup):
//!     register(path spec, method, handler)
//!     → matcher.rs (compile prefix / template / regex)
//!     → binder.rs (derive parameter roles, validate shape)
//!     → route.rs (immutable Route with specificity)
//!     → router.rs: build() sorts by specificity, freezes as Router
//!
//! Incoming Request (method, path):
//!     → router.rs (scan routes in specificity order)
//!     → matcher.rs (evaluate path, collect captures)
//!     → Return: Handled, NotFound or InternalError
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by specificity, then registration order)
//! - Registration errors abort startup

use thiserror::Error;

pub mod binder;
pub mod matcher;
pub mod route;
pub mod router;

pub use binder::{Handler, HandlerError, HandlerRef, HandlerResult, Role, ShapeError};
pub use matcher::{MatchContext, PathMatcher, PathSpec};
pub use route::Route;
pub use router::{Outcome, Router, RouterBuilder};

/// Errors raised while registering routes.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The handler's parameters do not fit the calling convention.
    #[error("invalid handler shape for {method} {spec}: {source}")]
    InvalidHandlerShape {
        method: String,
        spec: String,
        #[source]
        source: ShapeError,
    },

    /// The path template or regular expression does not compile.
    #[error("invalid path pattern {spec:?}: {reason}")]
    InvalidPattern { spec: String, reason: String },

    /// Path specs must be absolute.
    #[error("path {0:?} must start with '/'")]
    InvalidPath(String),
}
