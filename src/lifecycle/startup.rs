//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize the store and validator
//! - Register the inventory routes and freeze the table
//! - Wrap the table in a dispatcher and an HTTP server
//!
//! # Design Decisions
//! - Fail fast: a bad route registration aborts startup
//! - Listeners are bound by the caller, after everything else is ready

use std::sync::Arc;

use thiserror::Error;

use crate::config::ServiceConfig;
use crate::http::{Dispatcher, HttpServer};
use crate::inventory::{
    register_routes, FormValidator, InsertFormValidator, InventoryState, ItemStore, MemoryStore,
};
use crate::routing::{RegistrationError, Router};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("route registration failed: {0}")]
    Routes(#[from] RegistrationError),
}

/// Build the server with the default in-memory store.
pub fn build_server(config: ServiceConfig) -> Result<HttpServer, StartupError> {
    build_server_with(config, Arc::new(MemoryStore::new()), Arc::new(InsertFormValidator))
}

/// Build the server around the given store and validator.
pub fn build_server_with(
    config: ServiceConfig,
    store: Arc<dyn ItemStore>,
    validator: Arc<dyn FormValidator>,
) -> Result<HttpServer, StartupError> {
    let mut builder = Router::builder();
    register_routes(&mut builder, InventoryState::new(store, validator))?;
    let router = builder.build();

    let dispatcher = Dispatcher::new(router, config.listener.max_body_bytes);
    Ok(HttpServer::new(config, dispatcher))
}
