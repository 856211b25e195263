//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, tracing)
//!     → dispatcher.rs (fix response metadata, buffer body)
//!     → request.rs (method, path, parameters)
//!     → [routing decides handler]
//!     → response.rs (status + body, structured errors)
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod request;
pub mod response;
pub mod server;

pub use dispatcher::Dispatcher;
pub use request::{Request, RequestContext, X_REQUEST_ID};
pub use response::{ErrorBody, ResponseWriter, JSON_CONTENT_TYPE};
pub use server::HttpServer;
