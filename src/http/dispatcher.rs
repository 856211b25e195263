//! Dispatcher entry point.
//!
//! # Responsibilities
//! - Fix response metadata before any handler output
//! - Buffer the body and build the request context; 413 over the size
//!   cap, 400 when the body cannot be read
//! - Delegate to the router and translate its outcome into a response
//!
//! # Design Decisions
//! - Every request ends in exactly one response; no retries, no re-entry
//! - `NotFound` and `InternalError` use the structured error body
//! - Handler errors never reach the transport; details stay in the logs

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request as HttpRequest, Response, StatusCode};
use http_body_util::LengthLimitError;

use crate::http::request::{Request, RequestContext};
use crate::http::response::ResponseWriter;
use crate::observability::metrics;
use crate::routing::{Outcome, Router};

pub const NOT_FOUND_MESSAGE: &str = "Not found";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
pub const BAD_REQUEST_MESSAGE: &str = "Could not read request body";
pub const PAYLOAD_TOO_LARGE_MESSAGE: &str = "Request body too large";

/// The single seam between the host transport and the router.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    router: Arc<Router>,
    max_body_bytes: usize,
}

impl Dispatcher {
    pub fn new(router: Router, max_body_bytes: usize) -> Self {
        Self {
            router: Arc::new(router),
            max_body_bytes,
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Handle one inbound request.
    pub async fn handle(&self, request: HttpRequest<Body>) -> Response<Body> {
        let start = Instant::now();
        // Metadata is fixed here, before anything can write a body.
        let response = ResponseWriter::json();

        let (parts, body) = request.into_parts();
        let method = parts.method.clone();

        let bytes = match axum::body::to_bytes(body, self.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let (status, message) = if exceeds_limit(&e) {
                    (StatusCode::PAYLOAD_TOO_LARGE, PAYLOAD_TOO_LARGE_MESSAGE)
                } else {
                    (StatusCode::BAD_REQUEST, BAD_REQUEST_MESSAGE)
                };
                tracing::warn!(
                    method = %method,
                    path = %parts.uri.path(),
                    status = status.as_u16(),
                    error = %e,
                    "Failed to read request body"
                );
                response.send_error(status, message);
                metrics::record_rejected(method.as_str(), status.as_u16(), start);
                return response.finish();
            }
        };

        let request = Request::new(RequestContext::from_parts(&parts, &bytes));
        let outcome = self.router.dispatch(request.clone(), response.clone()).await;

        match outcome {
            Outcome::Handled => {}
            Outcome::NotFound => response.send_error(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE),
            Outcome::InternalError => {
                response.send_error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
            }
        }

        let status = response.status();
        tracing::debug!(
            request_id = request.request_id().unwrap_or("unknown"),
            method = %method,
            path = %request.path(),
            outcome = outcome.as_str(),
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request dispatched"
        );
        metrics::record_dispatch(method.as_str(), outcome, status.as_u16(), start);

        response.finish()
    }
}

/// Whether a body read failed on the size cap rather than on I/O.
fn exceeds_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::JSON_CONTENT_TYPE;
    use crate::routing::{HandlerResult, PathSpec};
    use axum::http::{header, Method};

    async fn created(_req: Request, res: ResponseWriter) -> HandlerResult {
        res.send_json(StatusCode::CREATED, &serde_json::json!({"ok": true}))?;
        Ok(())
    }

    async fn leaky(_req: Request, res: ResponseWriter) -> HandlerResult {
        res.write(b"{\"half\":");
        Err("password=hunter2 rejected by database".into())
    }

    async fn panicking(_req: Request, _res: ResponseWriter) -> HandlerResult {
        panic!("shelf collapsed")
    }

    async fn echo_name(req: Request, res: ResponseWriter) -> HandlerResult {
        res.write(req.param("name").unwrap_or_default().as_bytes());
        Ok(())
    }

    fn dispatcher() -> Dispatcher {
        let mut builder = Router::builder();
        builder
            .register(PathSpec::prefix("/leak"), Method::GET, leaky)
            .unwrap()
            .register(PathSpec::prefix("/panic"), Method::GET, panicking)
            .unwrap()
            .register(PathSpec::prefix("/echo"), Method::POST, echo_name)
            .unwrap()
            .register(PathSpec::prefix("/"), Method::POST, created)
            .unwrap();
        Dispatcher::new(builder.build(), 1024)
    }

    async fn send(dispatcher: &Dispatcher, request: HttpRequest<Body>) -> (StatusCode, String, String) {
        let response = dispatcher.handle(request).await;
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    fn request(method: Method, uri: &str) -> HttpRequest<Body> {
        HttpRequest::builder().method(method).uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_handled_keeps_handler_output() {
        let (status, content_type, body) = send(&dispatcher(), request(Method::POST, "/")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(content_type, JSON_CONTENT_TYPE);
        assert_eq!(body, r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let (status, content_type, body) = send(&dispatcher(), request(Method::GET, "/")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(content_type, JSON_CONTENT_TYPE);
        assert_eq!(body, r#"{"error":404,"message":"Not found"}"#);
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let (status, content_type, body) = send(&dispatcher(), request(Method::GET, "/leak")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(content_type, JSON_CONTENT_TYPE);
        assert_eq!(body, r#"{"error":500,"message":"Internal server error"}"#);
        assert!(!body.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_query_string_not_part_of_path() {
        let (status, _, _) = send(&dispatcher(), request(Method::GET, "/leak?x=/y")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_form_body_reaches_handler() {
        let request = HttpRequest::builder()
            .method(Method::POST)
            .uri("/echo")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("name=Butter"))
            .unwrap();
        let (status, _, body) = send(&dispatcher(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Butter");
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let request = HttpRequest::builder()
            .method(Method::POST)
            .uri("/echo")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(vec![b'a'; 4096]))
            .unwrap();
        let (status, content_type, body) = send(&dispatcher(), request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(content_type, JSON_CONTENT_TYPE);
        assert_eq!(body, r#"{"error":413,"message":"Request body too large"}"#);
    }

    #[tokio::test]
    async fn test_unreadable_body_rejected() {
        let chunks: Vec<Result<&'static str, std::io::Error>> = vec![
            Ok("name="),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer reset")),
        ];
        let request = HttpRequest::builder()
            .method(Method::POST)
            .uri("/echo")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from_stream(futures_util::stream::iter(chunks)))
            .unwrap();
        let (status, content_type, body) = send(&dispatcher(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(content_type, JSON_CONTENT_TYPE);
        assert_eq!(body, r#"{"error":400,"message":"Could not read request body"}"#);
    }

    #[tokio::test]
    async fn test_panicking_handler_is_internal_error() {
        let (status, content_type, body) = send(&dispatcher(), request(Method::GET, "/panic")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(content_type, JSON_CONTENT_TYPE);
        assert_eq!(body, r#"{"error":500,"message":"Internal server error"}"#);
    }

    #[tokio::test]
    async fn test_encoded_path_routes_like_plain() {
        let (status, _, _) = send(&dispatcher(), request(Method::GET, "/l%65ak")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
