//! Request context handed to handlers.
//!
//! # Responsibilities
//! - Capture method, path and query of the inbound request
//! - Decode query string and form-encoded body parameters
//! - Carry the request ID for log correlation
//!
//! # Design Decisions
//! - Path and query are kept apart; routing sees the path only
//! - The path is percent-decoded before routing, so `/items/%61ctive`
//!   and `/items/active` reach the same route
//! - Parameters keep arrival order, query first, then body; lookup
//!   returns the first value for a name
//! - Owned by a single dispatch; shared with the handler through an `Arc`

use std::ops::Deref;
use std::sync::Arc;

use axum::http::{header, request::Parts, Method};
use percent_encoding::percent_decode_str;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Per-request data visible to handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    method: Method,
    path: String,
    query: Option<String>,
    params: Vec<(String, String)>,
    request_id: Option<String>,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            params: Vec::new(),
            request_id: None,
        }
    }

    /// Build from the request head and the buffered body.
    pub fn from_parts(parts: &Parts, body: &[u8]) -> Self {
        let path = percent_decode_str(parts.uri.path()).decode_utf8_lossy();
        let mut ctx = Self::new(parts.method.clone(), path);
        if let Some(query) = parts.uri.query() {
            ctx = ctx.with_query(query);
        }

        let is_form = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with(FORM_CONTENT_TYPE))
            .unwrap_or(false);
        if is_form {
            ctx = ctx.with_form_body(body);
        }

        if let Some(id) = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
        {
            ctx = ctx.with_request_id(id);
        }
        ctx
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.params.extend(
            url::form_urlencoded::parse(query.as_bytes()).into_owned(),
        );
        self.query = Some(query.to_string());
        self
    }

    pub fn with_form_body(mut self, body: &[u8]) -> Self {
        self.params
            .extend(url::form_urlencoded::parse(body).into_owned());
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// First value of a parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}

/// Handle to the request context, the request parameter of a handler.
#[derive(Debug, Clone)]
pub struct Request(Arc<RequestContext>);

impl Request {
    pub fn new(ctx: RequestContext) -> Self {
        Self(Arc::new(ctx))
    }
}

impl Deref for Request {
    type Target = RequestContext;

    fn deref(&self) -> &RequestContext {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_form_and_query_params() {
        let parts = parts(
            axum::http::Request::builder()
                .method(Method::POST)
                .uri("http://localhost/items?name=query&page=2")
                .header("Content-Type", "application/x-www-form-urlencoded; charset=UTF-8")
                .header(X_REQUEST_ID, "abc-123"),
        );
        let ctx = RequestContext::from_parts(&parts, b"name=Milk+2%25&date-expiry=2030-01-01T10%3A00");

        assert_eq!(ctx.path(), "/items");
        assert_eq!(ctx.query(), Some("name=query&page=2"));
        assert_eq!(ctx.param("name"), Some("query")); // Query parameters come first
        assert_eq!(ctx.param("page"), Some("2"));
        assert_eq!(ctx.param("date-expiry"), Some("2030-01-01T10:00"));
        assert_eq!(ctx.params().len(), 4);
        assert_eq!(ctx.request_id(), Some("abc-123"));
    }

    #[test]
    fn test_body_ignored_without_form_content_type() {
        let parts = parts(
            axum::http::Request::builder()
                .method(Method::POST)
                .uri("/")
                .header("Content-Type", "application/json"),
        );
        let ctx = RequestContext::from_parts(&parts, b"name=Milk");

        assert_eq!(ctx.param("name"), None);
        assert_eq!(ctx.request_id(), None);
    }

    #[test]
    fn test_path_is_percent_decoded() {
        let parts = parts(axum::http::Request::builder().uri("/items/%61ctive%20milk?x=%2F"));
        let ctx = RequestContext::from_parts(&parts, b"");

        assert_eq!(ctx.path(), "/items/active milk");
        assert_eq!(ctx.query(), Some("x=%2F"));
        assert_eq!(ctx.param("x"), Some("/"));
    }

    #[test]
    fn test_path_excludes_query() {
        let ctx = RequestContext::new(Method::GET, "/fridge").with_query("x=1");
        assert_eq!(ctx.path(), "/fridge");
        assert_eq!(ctx.param("x"), Some("1"));
    }
}
