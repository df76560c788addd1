//! # Item Handlers
//!
//! CRUD over the in-memory [`ResourceStore`].
//!
//! ```text
//! GET    /items       - 200, all items
//! GET    /items/{id}  - 200, one item
//! POST   /items       - 201, created item
//! PUT    /items/{id}  - 200, merged item
//! DELETE /items/{id}  - 204, empty body
//! ```

use http::StatusCode;

use crate::envelope::{GatewayRequest, GatewayResponse};
use crate::errors::AppResult;
use crate::log_data;
use crate::logging::Logger;
use crate::middleware::ValidationMiddleware;
use crate::models::{NewResource, ResourcePatch};
use crate::store::ResourceStore;

pub fn list_items(store: &ResourceStore) -> AppResult<GatewayResponse> {
    Ok(GatewayResponse::json(StatusCode::OK, &store.list()?))
}

pub fn get_item(store: &ResourceStore, id: &str) -> AppResult<GatewayResponse> {
    Ok(GatewayResponse::json(StatusCode::OK, &store.get(id)?))
}

pub fn create_item(
    req: &GatewayRequest,
    store: &ResourceStore,
    logger: &Logger,
) -> AppResult<GatewayResponse> {
    let fields: NewResource = ValidationMiddleware::json_body(req)?;
    let item = store.create(fields)?;
    logger.info("Item created", log_data!("id" => item.id));
    Ok(GatewayResponse::json(StatusCode::CREATED, &item))
}

pub fn update_item(
    req: &GatewayRequest,
    store: &ResourceStore,
    id: &str,
    logger: &Logger,
) -> AppResult<GatewayResponse> {
    let patch: ResourcePatch = ValidationMiddleware::json_body(req)?;
    let item = store.update(id, patch)?;
    logger.info("Item updated", log_data!("id" => id));
    Ok(GatewayResponse::json(StatusCode::OK, &item))
}

pub fn delete_item(store: &ResourceStore, id: &str, logger: &Logger) -> AppResult<GatewayResponse> {
    store.delete(id)?;
    logger.info("Item deleted", log_data!("id" => id));
    Ok(GatewayResponse::empty(StatusCode::NO_CONTENT))
}
