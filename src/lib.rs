//! # QuickConfig Edge Gateway - Cloudflare Workers
//!
//! An HTTP edge gateway built with Rust and Cloudflare Workers. It proxies
//! AirScript sync-task calls to the KDocs API, serves versioned QuickConfig
//! templates out of KV storage, and hosts a small in-memory item collection.
//!
//! ## Architecture
//!
//! - **Router**: Ordered route table and the single matching routine
//! - **Gateway**: Dispatches a matched request and shapes every outcome into an envelope
//! - **Middleware**: CORS preflight/origin headers and request body validation
//! - **Handlers**: Version, template, sync-task and item handlers
//! - **Upstream**: Builds and sends upstream calls, translates failures
//! - **Storage / Store**: KV template lookups and the in-memory item collection
//!
//! ## Example Usage
//!
//! ```text
//! GET    /api/version                                    - Current version
//! GET    /template/{version}/{category}/{filename}       - Stored template
//! POST   /v1/wo/file/{fileId}/script/{taskId}/sync_task  - Proxy to KDocs
//! GET    /items | POST /items                            - List / create items
//! GET    /items/{id} | PUT | DELETE                      - Read / update / delete
//! ```

use std::sync::{Arc, OnceLock};

use serde_json::json;
use worker::*;

pub mod config;
pub mod constants;
pub mod envelope;
pub mod errors;
pub mod gateway;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod router;
pub mod storage;
pub mod store;
pub mod upstream;

use config::Config;
use constants::{CORS_ALLOW_ORIGIN, TEMPLATES_KV_NAME};
use envelope::{GatewayRequest, GatewayResponse};
use errors::{AppError, AppResult};
use gateway::Gateway;
use logging::Logger;
use middleware::CorsMiddleware;
use storage::{AssetStore, KvAssetStore};
use store::ResourceStore;
use upstream::FetchClient;

static CONFIG_CACHE: OnceLock<Arc<Config>> = OnceLock::new();
static ITEM_STORE: OnceLock<Arc<ResourceStore>> = OnceLock::new();

/// Main entry point for the Cloudflare Worker.
///
/// 1. Sets up panic handling
/// 2. Loads configuration once per isolate
/// 3. Converts the request and hands it to the [`Gateway`]
///
/// Any error raised outside the dispatcher (request conversion, binding
/// lookup) is rendered as a `500` envelope with CORS applied, so the caller
/// always receives the same JSON shape.
#[event(fetch)]
pub async fn main(req: Request, env: Env, _ctx: Context) -> Result<Response> {
    console_error_panic_hook::set_once();

    let logger = Logger::for_request();

    let response = match serve(req, &env, &logger).await {
        Ok(response) => response,
        Err(e) => {
            logger.error("Unhandled error", log_data!("error" => e.to_string()));
            CorsMiddleware::apply_headers(e.to_response())
        }
    };

    into_worker_response(response).or_else(|e| {
        logger.error("Failed to build response", log_data!("error" => e.to_string()));
        fallback_response(&e.to_string())
    })
}

async fn serve(mut req: Request, env: &Env, logger: &Logger) -> AppResult<GatewayResponse> {
    let config = load_config(env, logger);
    let items = ITEM_STORE
        .get_or_init(|| Arc::new(ResourceStore::new()))
        .clone();

    let assets = match env.kv(TEMPLATES_KV_NAME) {
        Ok(kv) => Some(KvAssetStore::new(kv)),
        Err(e) => {
            logger.warn(
                "Template store binding unavailable",
                log_data!("binding" => TEMPLATES_KV_NAME, "error" => e.to_string()),
            );
            None
        }
    };
    let upstream = FetchClient::new(config.upstream_timeout());

    let request = into_gateway_request(&mut req).await?;

    let gateway = Gateway {
        config: &config,
        items: &items,
        assets: assets.as_ref().map(|store| store as &dyn AssetStore),
        upstream: &upstream,
    };
    Ok(gateway.handle(request, logger).await)
}

fn load_config(env: &Env, logger: &Logger) -> Arc<Config> {
    if let Some(config) = CONFIG_CACHE.get() {
        return config.clone();
    }

    let config = Arc::new(Config::load(env, logger));
    let _ = CONFIG_CACHE.set(config.clone());
    config
}

async fn into_gateway_request(req: &mut Request) -> AppResult<GatewayRequest> {
    let method = http::Method::from_bytes(req.method().to_string().as_bytes())
        .map_err(|e| AppError::BadRequest(format!("unsupported method: {e}")))?;
    let path = req.url()?.path().to_string();

    let body = if method == http::Method::POST || method == http::Method::PUT {
        req.bytes().await?
    } else {
        Vec::new()
    };

    Ok(GatewayRequest::new(method, path).with_body(body))
}

fn into_worker_response(response: GatewayResponse) -> Result<Response> {
    let headers = Headers::new();
    for (name, value) in &response.headers {
        headers.set(name, value)?;
    }

    let status = response.status.as_u16();
    let out = if response.body.is_empty() {
        Response::empty()?
    } else {
        Response::from_bytes(response.body)?
    };
    Ok(out.with_status(status).with_headers(headers))
}

fn fallback_response(details: &str) -> Result<Response> {
    let headers = Headers::new();
    headers.set("Content-Type", constants::CONTENT_TYPE_JSON)?;
    headers.set("Access-Control-Allow-Origin", CORS_ALLOW_ORIGIN)?;
    Ok(Response::from_json(&json!({
        "error": "internal server error",
        "details": details
    }))?
    .with_status(500)
    .with_headers(headers))
}
