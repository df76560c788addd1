//! # Middleware Components
//!
//! Cross-cutting request/response processing for the gateway.
//!
//! ## Middleware Types
//!
//! - **CORS Middleware**: Preflight responses and the origin header applied to
//!   every outbound response, errors and 404s included
//! - **Validation Middleware**: JSON body decoding with errors mapped to `400`
//!
//! ## Usage Examples
//!
//! ```rust,ignore
//! // Handle CORS preflight
//! if req.method == Method::OPTIONS {
//!     return CorsMiddleware::handle_preflight();
//! }
//!
//! // Apply CORS headers to response
//! let response = CorsMiddleware::apply_headers(response);
//!
//! // Decode an item body
//! let fields: NewResource = ValidationMiddleware::json_body(&req)?;
//! ```

use http::StatusCode;
use serde::de::DeserializeOwned;

use crate::constants::{CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS, CORS_ALLOW_ORIGIN};
use crate::envelope::{GatewayRequest, GatewayResponse};
use crate::errors::{AppError, AppResult};

/// Middleware for handling Cross-Origin Resource Sharing (CORS) requests.
///
/// The gateway allows all origins (`*`). Preflight responses additionally
/// advertise the allowed methods and the `AirScript-Token` request header.
pub struct CorsMiddleware;

impl CorsMiddleware {
    /// Applies the origin header to an existing response.
    ///
    /// Called once by the dispatcher on every outbound response regardless of
    /// which handler produced it.
    pub fn apply_headers(response: GatewayResponse) -> GatewayResponse {
        response.with_header("Access-Control-Allow-Origin", CORS_ALLOW_ORIGIN)
    }

    /// Handles CORS preflight requests (OPTIONS method).
    ///
    /// Returns an empty `204` carrying the three CORS headers.
    pub fn handle_preflight() -> GatewayResponse {
        GatewayResponse::empty(StatusCode::NO_CONTENT)
            .with_header("Access-Control-Allow-Origin", CORS_ALLOW_ORIGIN)
            .with_header("Access-Control-Allow-Methods", CORS_ALLOW_METHODS)
            .with_header("Access-Control-Allow-Headers", CORS_ALLOW_HEADERS)
    }
}

/// Middleware for validating request bodies.
///
/// All validation functions return `AppResult<T>` so a malformed body
/// surfaces as a structured `400` envelope.
pub struct ValidationMiddleware;

impl ValidationMiddleware {
    /// Decodes the request body as JSON into `T`.
    ///
    /// # Errors
    ///
    /// - `BadRequest`: empty body, malformed JSON, or a shape that does not fit `T`
    pub fn json_body<T: DeserializeOwned>(req: &GatewayRequest) -> AppResult<T> {
        if req.body.is_empty() {
            return Err(AppError::BadRequest("request body is empty".to_string()));
        }
        req.json()
            .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {e}")))
    }
}
