//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router that hands every request to the dispatcher
//! - Wire up transport layers (tracing, timeout, request ID)
//! - Render errors raised by those layers with the structured JSON body
//! - Bind server to listener and serve until shutdown

use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, Response, StatusCode},
    middleware::map_response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::http::dispatcher::Dispatcher;
use crate::http::response::{ErrorBody, JSON_CONTENT_TYPE};

/// HTTP server for the inventory service.
pub struct HttpServer {
    app: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server around a dispatcher.
    pub fn new(config: ServiceConfig, dispatcher: Dispatcher) -> Self {
        let app = Self::build_app(&config, dispatcher);
        Self { app, config }
    }

    /// Build the Axum router with all middleware layers.
    /// Routing is ours: every path falls through to the dispatcher.
    #[allow(deprecated)]
    fn build_app(config: &ServiceConfig, dispatcher: Dispatcher) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(dispatcher)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(map_response(render_transport_error))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// A clone of the Axum app, for in-process use.
    pub fn app(&self) -> Router {
        self.app.clone()
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            request_timeout_secs = self.config.timeouts.request_secs,
            "HTTP server starting"
        );

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

async fn dispatch_handler(
    State(dispatcher): State<Dispatcher>,
    request: Request<Body>,
) -> Response<Body> {
    dispatcher.handle(request).await
}

/// Give an error response produced outside the dispatcher, such as a
/// timeout, the JSON error body. Dispatcher output always carries a
/// content type and passes through untouched.
async fn render_transport_error(response: Response<Body>) -> Response<Body> {
    let status = response.status();
    let is_error = status.is_client_error() || status.is_server_error();
    if !is_error || response.headers().contains_key(header::CONTENT_TYPE) {
        return response;
    }

    let message = match status {
        StatusCode::REQUEST_TIMEOUT => "Request timed out",
        _ => status.canonical_reason().unwrap_or("Request failed"),
    };
    let body = serde_json::to_vec(&ErrorBody::new(status, message)).unwrap_or_default();

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    Response::from_parts(parts, Body::from(body))
}
