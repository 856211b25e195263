//! Request handlers and route table for the fridge.

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde::Serialize;
use uuid::Uuid;

use crate::http::{Request, ResponseWriter};
use crate::inventory::form::{parse_local_date_time, FormValidator, InsertForm, Violation};
use crate::inventory::store::{ItemStore, StoreError};
use crate::routing::{HandlerResult, MatchContext, PathSpec, RegistrationError, RouterBuilder};

const INSERT_FAILED_MESSAGE: &str = "Could not insert in the DB";
const FORM_ERRORS_MESSAGE: &str = "Form contains errors";

/// Shared dependencies of the inventory handlers.
#[derive(Clone)]
pub struct InventoryState {
    pub store: Arc<dyn ItemStore>,
    pub validator: Arc<dyn FormValidator>,
}

impl InventoryState {
    pub fn new(store: Arc<dyn ItemStore>, validator: Arc<dyn FormValidator>) -> Self {
        Self { store, validator }
    }
}

/// 400 body listing every violated constraint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationErrorBody<'a> {
    error: u16,
    message: &'static str,
    validation_messages: &'a [Violation],
}

/// Register the fridge routes.
///
/// - `GET /` lists items
/// - `POST /` inserts an item from form fields `name` and `date-expiry`
/// - `GET /items/:id` fetches one item
pub fn register_routes(
    router: &mut RouterBuilder,
    state: InventoryState,
) -> Result<(), RegistrationError> {
    let list_state = state.clone();
    let insert_state = state.clone();
    let get_state = state;

    router
        .register(PathSpec::prefix("/"), Method::GET, move |req: Request, res: ResponseWriter| {
            list_items(list_state.clone(), req, res)
        })?
        .register(PathSpec::prefix("/"), Method::POST, move |req: Request, res: ResponseWriter| {
            insert_item(insert_state.clone(), req, res)
        })?
        .register(
            PathSpec::template("/items/:id"),
            Method::GET,
            move |req: Request, res: ResponseWriter, ctx: MatchContext| {
                get_item(get_state.clone(), req, res, ctx)
            },
        )?;
    Ok(())
}

async fn list_items(state: InventoryState, _req: Request, res: ResponseWriter) -> HandlerResult {
    let items = state.store.list_items()?;
    res.send_json(StatusCode::OK, &items)?;
    Ok(())
}

async fn insert_item(state: InventoryState, req: Request, res: ResponseWriter) -> HandlerResult {
    let form = InsertForm::from_request(&req);
    let violations = state.validator.validate(&form);

    if !violations.is_empty() {
        tracing::debug!(violations = violations.len(), "Insert form rejected");
        res.send_json(
            StatusCode::BAD_REQUEST,
            &ValidationErrorBody {
                error: StatusCode::BAD_REQUEST.as_u16(),
                message: FORM_ERRORS_MESSAGE,
                validation_messages: &violations,
            },
        )?;
        return Ok(());
    }

    let (Some(name), Some(date_expiry)) = (
        form.name.as_deref(),
        form.date_expiry.as_deref().and_then(parse_local_date_time),
    ) else {
        return Err("validator accepted a form without name or expiry".into());
    };
    let date_expiry = date_expiry.and_utc();

    let id = Uuid::new_v4();
    let inserted = state
        .store
        .insert_item(id, name, date_expiry)
        .and_then(|()| state.store.get_item(id));

    match inserted {
        Ok(item) => {
            tracing::info!(id = %item.id, name = %item.name, "Item added to fridge");
            res.send_json(StatusCode::CREATED, &item)?;
        }
        Err(e) => {
            tracing::error!(id = %id, error = %e, "Error while inserting in the DB");
            res.send_error(StatusCode::INTERNAL_SERVER_ERROR, INSERT_FAILED_MESSAGE);
        }
    }
    Ok(())
}

async fn get_item(
    state: InventoryState,
    _req: Request,
    res: ResponseWriter,
    ctx: MatchContext,
) -> HandlerResult {
    let Some(id) = ctx.name("id").and_then(|raw| Uuid::parse_str(raw).ok()) else {
        res.send_error(StatusCode::BAD_REQUEST, "Invalid item identifier");
        return Ok(());
    };

    match state.store.get_item(id) {
        Ok(item) => res.send_json(StatusCode::OK, &item)?,
        Err(StoreError::NotFound(_)) => res.send_error(StatusCode::NOT_FOUND, "Not found"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
