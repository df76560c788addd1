//! # HTTP Request Handlers
//!
//! One handler family per route kind. Handlers return `AppResult<GatewayResponse>`;
//! the dispatcher turns errors into envelopes and applies CORS afterwards.
//!
//! ## Handler Categories
//!
//! - **Template Handlers**: Serve versioned assets from KV
//! - **Sync Task Handlers**: Proxy script runs to the upstream API
//! - **Item Handlers**: CRUD over the in-memory collection
//! - **Service Handlers**: Version reporting and the 404 fallback

use http::StatusCode;
use serde_json::json;

use crate::config::Config;
use crate::envelope::GatewayResponse;

pub mod items;
pub mod sync_task;
pub mod template;

/// Reports the deployed version.
///
/// # Response Format
///
/// ```json
/// { "version": "1.0.0" }
/// ```
pub fn handle_version(config: &Config) -> GatewayResponse {
    GatewayResponse::json(StatusCode::OK, &json!({ "version": config.resolve_version() }))
}

/// Handles requests to unmatched routes with a 404 Not Found response.
pub fn handle_not_found() -> GatewayResponse {
    GatewayResponse::error(StatusCode::NOT_FOUND, "resource not found", None)
}
