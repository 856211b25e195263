//! Response handling.
//!
//! # Responsibilities
//! - Fix response metadata (content type, charset) before any body is written
//! - Collect the status and body a handler produces
//! - Render the structured error body shared by all error responses
//!
//! # Design Decisions
//! - Metadata is set once, when the writer is created; handlers only touch
//!   status and body
//! - The body is buffered; streaming is out of scope
//! - An error response discards whatever a failed handler wrote

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use serde::Serialize;

/// Content type of every response the service produces.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Structured error payload: `{"error": <status>, "message": <text>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: u16,
    pub message: String,
}

impl ErrorBody {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            error: status.as_u16(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
struct ResponseDraft {
    status: StatusCode,
    content_type: HeaderValue,
    body: Vec<u8>,
}

/// The response parameter of a handler.
///
/// Clones share the same draft.
#[derive(Debug, Clone)]
pub struct ResponseWriter {
    draft: Arc<Mutex<ResponseDraft>>,
}

impl ResponseWriter {
    /// A writer whose content type is already fixed.
    pub fn new(content_type: HeaderValue) -> Self {
        Self {
            draft: Arc::new(Mutex::new(ResponseDraft {
                status: StatusCode::OK,
                content_type,
                body: Vec::new(),
            })),
        }
    }

    /// A writer producing `application/json; charset=utf-8`.
    pub fn json() -> Self {
        Self::new(HeaderValue::from_static(JSON_CONTENT_TYPE))
    }

    fn draft(&self) -> MutexGuard<'_, ResponseDraft> {
        self.draft.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_status(&self, status: StatusCode) {
        self.draft().status = status;
    }

    pub fn status(&self) -> StatusCode {
        self.draft().status
    }

    /// Append raw bytes to the body.
    pub fn write(&self, bytes: &[u8]) {
        self.draft().body.extend_from_slice(bytes);
    }

    /// Append a JSON document to the body.
    pub fn write_json<T: Serialize>(&self, value: &T) -> Result<(), serde_json::Error> {
        let bytes = serde_json::to_vec(value)?;
        self.write(&bytes);
        Ok(())
    }

    /// Set the status and write a JSON document.
    pub fn send_json<T: Serialize>(
        &self,
        status: StatusCode,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        self.set_status(status);
        self.write_json(value)
    }

    /// Replace any output with a structured error.
    pub fn send_error(&self, status: StatusCode, message: &str) {
        let body = ErrorBody::new(status, message);
        let mut draft = self.draft();
        draft.status = status;
        // Serializing two plain fields cannot fail.
        draft.body = serde_json::to_vec(&body).unwrap_or_default();
    }

    /// Snapshot of the body written so far.
    pub fn body(&self) -> Vec<u8> {
        self.draft().body.clone()
    }

    /// Take the draft and turn it into an HTTP response.
    pub fn finish(&self) -> Response<Body> {
        let mut draft = self.draft();
        let body = std::mem::take(&mut draft.body);

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = draft.status;
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, draft.content_type.clone());
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let writer = ResponseWriter::json();
        assert_eq!(writer.status(), StatusCode::OK);
        assert!(writer.body().is_empty());

        let response = writer.finish();
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            JSON_CONTENT_TYPE
        );
    }

    #[test]
    fn test_clones_share_draft() {
        let writer = ResponseWriter::json();
        let handle = writer.clone();
        handle.send_json(StatusCode::CREATED, &serde_json::json!({"id": 1})).unwrap();

        assert_eq!(writer.status(), StatusCode::CREATED);
        assert_eq!(writer.body(), br#"{"id":1}"#.to_vec());
    }

    #[test]
    fn test_send_error_discards_partial_output() {
        let writer = ResponseWriter::json();
        writer.write(b"[{\"partial\":");
        writer.send_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");

        assert_eq!(writer.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            String::from_utf8(writer.body()).unwrap(),
            r#"{"error":500,"message":"Internal server error"}"#
        );
    }
}
