//! # Application Constants
//!
//! This module defines application-wide constants used throughout the gateway.
//!
//! ## Binding Names
//!
//! Constants for Cloudflare Worker bindings that must match wrangler.toml configuration.
//!
//! ## Upstream
//!
//! Endpoint template and header values for the KDocs AirScript API.
//!
//! ## Headers
//!
//! CORS values shared by every outbound response.

/// KV namespace binding holding versioned template assets
pub const TEMPLATES_KV_NAME: &str = "TEMPLATES_KV";

/// Worker var carrying the version override
pub const VERSION_VAR: &str = "CURRENT_VERSION";

/// Worker secret (or var) carrying the upstream AirScript token
pub const UPSTREAM_TOKEN_VAR: &str = "AirScript_Token";

/// Worker var overriding the upstream endpoint template
pub const UPSTREAM_ENDPOINT_VAR: &str = "UPSTREAM_ENDPOINT";

/// Worker var overriding the upstream timeout, in seconds
pub const UPSTREAM_TIMEOUT_VAR: &str = "UPSTREAM_TIMEOUT_SECS";

/// Version reported when neither an override nor a bundled default exists
pub const FALLBACK_VERSION: &str = "1.0.0";

/// Version baked in at build time, if any
pub const BUNDLED_VERSION: Option<&str> = option_env!("GATEWAY_BUNDLED_VERSION");

/// Upstream sync task endpoint. `{file_id}` and `{task_id}` are substituted per call.
pub const DEFAULT_UPSTREAM_ENDPOINT: &str =
    "https://365.kdocs.cn/api/v3/ide/file/{file_id}/script/{task_id}/sync_task";

/// `Origin` header value sent upstream
pub const UPSTREAM_ORIGIN: &str = ".kdocs.cn";

/// Proprietary auth header understood by the upstream API
pub const HEADER_AIRSCRIPT_TOKEN: &str = "AirScript-Token";

/// Default upstream call timeout (20s)
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 20;

/// JSON content type used by every envelope
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// CORS header for allowed origins
pub const CORS_ALLOW_ORIGIN: &str = "*";

/// CORS header for allowed methods
pub const CORS_ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// CORS header for allowed headers
pub const CORS_ALLOW_HEADERS: &str = "Content-Type, AirScript-Token";
