//! Fridge inventory application.
//!
//! # Data Flow
//! ```text
//! Router ── GET  /           → handlers::list_items  → ItemStore::list_items
//!        ── POST /           → InsertForm → FormValidator → ItemStore::insert_item
//!        ── GET  /items/:id  → handlers::get_item    → ItemStore::get_item
//! ```
//!
//! # Design Decisions
//! - Handlers are ordinary async functions; the router binds them by
//!   parameter type
//! - The store and validator sit behind traits so tests can swap them

pub mod form;
pub mod handlers;
pub mod model;
pub mod store;

pub use form::{FormValidator, InsertForm, InsertFormValidator, Violation};
pub use handlers::{register_routes, InventoryState};
pub use model::Item;
pub use store::{ItemStore, MemoryStore, StoreError};
