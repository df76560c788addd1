//! # Template Handlers
//!
//! Resolves `GET /template/{version}/{category}/{filename}` against the
//! template store. The storage key is `{version}/{category}/{filename}` and the
//! response content type is derived from the filename extension.

use http::StatusCode;
use serde_json::json;

use crate::envelope::GatewayResponse;
use crate::errors::{AppError, AppResult};
use crate::log_data;
use crate::logging::Logger;
use crate::storage::AssetStore;

/// Location of one stored template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetKey {
    pub version: String,
    pub category: String,
    pub filename: String,
}

impl AssetKey {
    pub fn new(version: &str, category: &str, filename: &str) -> Self {
        Self {
            version: version.to_string(),
            category: category.to_string(),
            filename: filename.to_string(),
        }
    }

    /// Builds a key from percent-encoded path segments, as they appear in the
    /// request URL. Returns `None` when a segment does not decode to UTF-8 or
    /// decodes to something containing `/`.
    pub fn decode(version: &str, category: &str, filename: &str) -> Option<Self> {
        let segment = |raw: &str| {
            urlencoding::decode(raw)
                .ok()
                .filter(|decoded| !decoded.is_empty() && !decoded.contains('/'))
                .map(|decoded| decoded.into_owned())
        };
        Some(Self {
            version: segment(version)?,
            category: segment(category)?,
            filename: segment(filename)?,
        })
    }

    pub fn storage_key(&self) -> String {
        format!("{}/{}/{}", self.version, self.category, self.filename)
    }

    pub fn content_type(&self) -> &'static str {
        content_type_for(&self.filename)
    }
}

/// Maps a filename extension to a MIME type, defaulting to JSON.
pub fn content_type_for(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("csv") => "text/csv",
        Some("txt") => "text/plain",
        Some("html") => "text/html",
        Some("xml") => "application/xml",
        _ => "application/json",
    }
}

/// Serves a stored template.
///
/// # Responses
///
/// - `200` with the stored bytes and the derived content type
/// - `404` `{"error", "requestedPath"}` when the key is absent or no store is bound
///
/// # Errors
///
/// A failed store read is returned as `Internal`, carrying the read error.
pub async fn handle_template(
    assets: Option<&dyn AssetStore>,
    key: &AssetKey,
    requested_path: &str,
    logger: &Logger,
) -> AppResult<GatewayResponse> {
    let storage_key = key.storage_key();

    let Some(assets) = assets else {
        logger.warn("Template store is not bound", log_data!("key" => storage_key));
        return Ok(template_not_found(requested_path));
    };

    let stored = assets.get(&storage_key).await.map_err(|e| {
        AppError::Internal(format!("failed to read template {storage_key}: {e}"))
    })?;

    match stored {
        Some(bytes) => {
            logger.info(
                "Template served",
                log_data!("key" => storage_key, "bytes" => bytes.len()),
            );
            Ok(GatewayResponse::raw(StatusCode::OK, key.content_type(), bytes))
        }
        None => {
            logger.warn("Template not found", log_data!("key" => storage_key));
            Ok(template_not_found(requested_path))
        }
    }
}

pub fn template_not_found(requested_path: &str) -> GatewayResponse {
    GatewayResponse::json(
        StatusCode::NOT_FOUND,
        &json!({ "error": "template not found", "requestedPath": requested_path }),
    )
}
