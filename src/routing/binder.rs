//! Handler binding.
//!
//! # Responsibilities
//! - Derive the parameter roles of a handler from its argument types
//! - Validate the calling convention once, at registration
//! - Produce an immutable [`HandlerRef`] that dispatch invokes without
//!   re-inspecting anything
//!
//! # Design Decisions
//! - Roles come from types ([`HandlerParam::ROLE`]), not positions, so a
//!   handler may declare `(ResponseWriter, Request)` as well as
//!   `(Request, ResponseWriter)`
//! - [`Handler`] is implemented for arities 0 through 4 so a malformed
//!   handler is reported as a registration error instead of a type error
//!   far from the route table
//! - Panics inside a handler are converted into errors at invocation

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use thiserror::Error;

use crate::http::{Request, ResponseWriter};
use crate::routing::matcher::MatchContext;

/// Error returned by a failing handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result of a handler invocation.
pub type HandlerResult = Result<(), HandlerError>;

/// Role of a handler parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Request,
    Response,
    MatchContext,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Request => write!(f, "request"),
            Role::Response => write!(f, "response"),
            Role::MatchContext => write!(f, "match context"),
        }
    }
}

/// Reasons a handler's shape is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    /// Handlers take two or three parameters.
    #[error("handler takes {0} parameters, expected request, response and an optional match context")]
    Arity(usize),

    #[error("handler has no {0} parameter")]
    Missing(Role),

    #[error("handler declares more than one {0} parameter")]
    Duplicate(Role),

    /// A literal prefix route never produces sub-match data.
    #[error("match context parameter declared on a route without a pattern")]
    MatchContextWithoutPattern,
}

/// Values available to a handler for one invocation.
#[derive(Clone)]
pub struct CallArgs {
    pub request: Request,
    pub response: ResponseWriter,
    pub match_context: MatchContext,
}

/// A type that may appear as a handler parameter.
pub trait HandlerParam: Send + 'static {
    const ROLE: Role;

    fn from_args(args: &CallArgs) -> Self;
}

impl HandlerParam for Request {
    const ROLE: Role = Role::Request;

    fn from_args(args: &CallArgs) -> Self {
        args.request.clone()
    }
}

impl HandlerParam for ResponseWriter {
    const ROLE: Role = Role::Response;

    fn from_args(args: &CallArgs) -> Self {
        args.response.clone()
    }
}

impl HandlerParam for MatchContext {
    const ROLE: Role = Role::MatchContext;

    fn from_args(args: &CallArgs) -> Self {
        args.match_context.clone()
    }
}

/// Application code callable by the router.
///
/// Implemented for every `Fn` of up to four [`HandlerParam`] arguments
/// returning a future of [`HandlerResult`].
pub trait Handler<Args>: Send + Sync + 'static {
    /// Roles of the declared parameters, in declaration order.
    fn roles() -> Vec<Role>;

    fn call(&self, args: CallArgs) -> BoxFuture<'static, HandlerResult>;
}

macro_rules! impl_handler {
    ($($param:ident),*) => {
        impl<F, Fut, $($param,)*> Handler<($($param,)*)> for F
        where
            F: Fn($($param),*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = HandlerResult> + Send + 'static,
            $($param: HandlerParam,)*
        {
            fn roles() -> Vec<Role> {
                vec![$($param::ROLE),*]
            }

            #[allow(unused_variables)]
            fn call(&self, args: CallArgs) -> BoxFuture<'static, HandlerResult> {
                Box::pin((self)($($param::from_args(&args)),*))
            }
        }
    };
}

impl_handler!();
impl_handler!(A);
impl_handler!(A, B);
impl_handler!(A, B, C);
impl_handler!(A, B, C, D);

/// Object-safe view of a bound handler.
trait ErasedHandler: Send + Sync {
    fn call(&self, args: CallArgs) -> BoxFuture<'static, HandlerResult>;
}

struct Erased<H, Args> {
    handler: H,
    _args: PhantomData<fn() -> Args>,
}

impl<H, Args> ErasedHandler for Erased<H, Args>
where
    H: Handler<Args>,
    Args: 'static,
{
    fn call(&self, args: CallArgs) -> BoxFuture<'static, HandlerResult> {
        self.handler.call(args)
    }
}

/// Resolved positions of each role in a handler's parameter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub arity: usize,
    pub request: usize,
    pub response: usize,
    pub match_context: Option<usize>,
}

impl Binding {
    /// Validate a list of roles. `accepts_match_context` is false for matchers
    /// that never produce sub-match data.
    pub fn resolve(roles: &[Role], accepts_match_context: bool) -> Result<Self, ShapeError> {
        if roles.len() != 2 && roles.len() != 3 {
            return Err(ShapeError::Arity(roles.len()));
        }

        let mut request = None;
        let mut response = None;
        let mut match_context = None;
        for (position, role) in roles.iter().enumerate() {
            let slot = match role {
                Role::Request => &mut request,
                Role::Response => &mut response,
                Role::MatchContext => &mut match_context,
            };
            if slot.replace(position).is_some() {
                return Err(ShapeError::Duplicate(*role));
            }
        }

        let request = request.ok_or(ShapeError::Missing(Role::Request))?;
        let response = response.ok_or(ShapeError::Missing(Role::Response))?;
        if match_context.is_some() && !accepts_match_context {
            return Err(ShapeError::MatchContextWithoutPattern);
        }

        Ok(Self {
            arity: roles.len(),
            request,
            response,
            match_context,
        })
    }
}

/// A validated handler together with its binding.
#[derive(Clone)]
pub struct HandlerRef {
    binding: Binding,
    handler: Arc<dyn ErasedHandler>,
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRef")
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

impl HandlerRef {
    /// Bind a handler, checking its shape.
    pub fn bind<H, Args>(handler: H, accepts_match_context: bool) -> Result<Self, ShapeError>
    where
        H: Handler<Args>,
        Args: 'static,
    {
        let binding = Binding::resolve(&H::roles(), accepts_match_context)?;
        Ok(Self {
            binding,
            handler: Arc::new(Erased {
                handler,
                _args: PhantomData,
            }),
        })
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Invoke the handler. Panics, whether raised while building the future
    /// or while polling it, come back as errors.
    pub async fn invoke(&self, args: CallArgs) -> HandlerResult {
        let future = match panic::catch_unwind(AssertUnwindSafe(|| self.handler.call(args))) {
            Ok(future) => future,
            Err(payload) => return Err(HandlerPanic::from_payload(payload).into()),
        };

        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(HandlerPanic::from_payload(payload).into()),
        }
    }
}

/// A handler panicked during invocation.
#[derive(Debug, Error)]
#[error("handler panicked: {0}")]
pub struct HandlerPanic(String);

impl HandlerPanic {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RequestContext;
    use axum::http::{Method, StatusCode};

    async fn request_response(_req: Request, res: ResponseWriter) -> HandlerResult {
        res.set_status(StatusCode::NO_CONTENT);
        Ok(())
    }

    async fn response_request(res: ResponseWriter, _req: Request) -> HandlerResult {
        res.set_status(StatusCode::ACCEPTED);
        Ok(())
    }

    async fn with_captures(_req: Request, ctx: MatchContext, res: ResponseWriter) -> HandlerResult {
        res.write(ctx.name("id").unwrap_or_default().as_bytes());
        Ok(())
    }

    async fn only_request(_req: Request) -> HandlerResult {
        Ok(())
    }

    async fn two_requests(_a: Request, _b: Request) -> HandlerResult {
        Ok(())
    }

    async fn two_responses(_a: ResponseWriter, _b: ResponseWriter, _req: Request) -> HandlerResult {
        Ok(())
    }

    async fn four_params(
        _a: Request,
        _b: ResponseWriter,
        _c: MatchContext,
        _d: MatchContext,
    ) -> HandlerResult {
        Ok(())
    }

    async fn failing(_req: Request, _res: ResponseWriter) -> HandlerResult {
        Err("storage offline".into())
    }

    async fn panicking(_req: Request, _res: ResponseWriter) -> HandlerResult {
        panic!("boom")
    }

    fn args() -> CallArgs {
        CallArgs {
            request: Request::new(RequestContext::new(Method::GET, "/items/9")),
            response: ResponseWriter::json(),
            match_context: MatchContext::default(),
        }
    }

    #[test]
    fn test_binding_positions() {
        let handler = HandlerRef::bind(request_response, false).unwrap();
        assert_eq!(
            *handler.binding(),
            Binding { arity: 2, request: 0, response: 1, match_context: None }
        );

        let handler = HandlerRef::bind(response_request, false).unwrap();
        assert_eq!(handler.binding().request, 1);
        assert_eq!(handler.binding().response, 0);

        let handler = HandlerRef::bind(with_captures, true).unwrap();
        assert_eq!(handler.binding().match_context, Some(1));
        assert_eq!(handler.binding().response, 2);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert_eq!(
            HandlerRef::bind(only_request, false).unwrap_err(),
            ShapeError::Arity(1)
        );
        assert_eq!(
            HandlerRef::bind(two_requests, false).unwrap_err(),
            ShapeError::Duplicate(Role::Request)
        );
        assert_eq!(
            HandlerRef::bind(two_responses, false).unwrap_err(),
            ShapeError::Duplicate(Role::Response)
        );
        assert_eq!(
            HandlerRef::bind(four_params, true).unwrap_err(),
            ShapeError::Arity(4)
        );
        assert_eq!(
            HandlerRef::bind(with_captures, false).unwrap_err(),
            ShapeError::MatchContextWithoutPattern
        );
    }

    #[test]
    fn test_missing_roles() {
        assert_eq!(
            Binding::resolve(&[Role::Request, Role::MatchContext], true).unwrap_err(),
            ShapeError::Missing(Role::Response)
        );
        assert_eq!(
            Binding::resolve(&[Role::MatchContext, Role::Response], true).unwrap_err(),
            ShapeError::Missing(Role::Request)
        );
        assert_eq!(Binding::resolve(&[], true).unwrap_err(), ShapeError::Arity(0));
    }

    #[tokio::test]
    async fn test_invoke_passes_values_by_role() {
        let handler = HandlerRef::bind(response_request, false).unwrap();
        let args = args();
        let response = args.response.clone();

        handler.invoke(args).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_invoke_returns_handler_error() {
        let handler = HandlerRef::bind(failing, false).unwrap();
        let err = handler.invoke(args()).await.unwrap_err();
        assert_eq!(err.to_string(), "storage offline");
    }

    #[tokio::test]
    async fn test_invoke_converts_panic() {
        let handler = HandlerRef::bind(panicking, false).unwrap();
        let err = handler.invoke(args()).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
